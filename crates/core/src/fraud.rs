use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Transaction categories known to the fraud model, in label-encoding order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    CashIn,
    CashOut,
    Debit,
    Payment,
    Transfer,
}

impl TransactionKind {
    /// Index assigned by the encoder the model was trained with.
    pub fn encoded(self) -> u8 {
        match self {
            TransactionKind::CashIn => 0,
            TransactionKind::CashOut => 1,
            TransactionKind::Debit => 2,
            TransactionKind::Payment => 3,
            TransactionKind::Transfer => 4,
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionKind::CashIn => write!(f, "CASH_IN"),
            TransactionKind::CashOut => write!(f, "CASH_OUT"),
            TransactionKind::Debit => write!(f, "DEBIT"),
            TransactionKind::Payment => write!(f, "PAYMENT"),
            TransactionKind::Transfer => write!(f, "TRANSFER"),
        }
    }
}

impl std::str::FromStr for TransactionKind {
    type Err = ScoringError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CASH_IN" => Ok(TransactionKind::CashIn),
            "CASH_OUT" => Ok(TransactionKind::CashOut),
            "DEBIT" => Ok(TransactionKind::Debit),
            "PAYMENT" => Ok(TransactionKind::Payment),
            "TRANSFER" => Ok(TransactionKind::Transfer),
            other => Err(ScoringError::UnknownKind(other.to_string())),
        }
    }
}

/// A payment transaction as submitted for scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub step: u32,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub amount: f64,
    #[serde(rename = "oldbalanceOrg")]
    pub old_balance_origin: f64,
    #[serde(rename = "newbalanceOrig")]
    pub new_balance_origin: f64,
    #[serde(rename = "oldbalanceDest")]
    pub old_balance_dest: f64,
    #[serde(rename = "newbalanceDest")]
    pub new_balance_dest: f64,
    #[serde(rename = "isFlaggedFraud")]
    pub is_flagged_fraud: u8,
    // Carried for other consumers; the model ignores them.
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub geo: Option<HashMap<String, f64>>,
    #[serde(default, rename = "BIN")]
    pub bin: Option<String>,
}

pub const FEATURE_COUNT: usize = 10;

/// Fixed-shape model input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector(pub [f64; FEATURE_COUNT]);

impl Transaction {
    pub fn features(&self) -> FeatureVector {
        FeatureVector([
            self.step as f64,
            self.amount,
            self.old_balance_origin,
            self.new_balance_origin,
            self.old_balance_dest,
            self.new_balance_dest,
            self.old_balance_origin - self.new_balance_origin,
            self.new_balance_dest - self.old_balance_dest,
            self.kind.encoded() as f64,
            self.is_flagged_fraud as f64,
        ])
    }
}

#[derive(Debug, Clone, Error)]
pub enum ScoringError {
    #[error("Unknown transaction type: '{0}'")]
    UnknownKind(String),
    #[error("Fraud probability out of range: {0}")]
    InvalidProbability(f64),
    #[error("Fraud model error: {0}")]
    Model(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FraudScore {
    pub is_fraud: bool,
    /// Probability of the fraud class (0.0–1.0).
    pub probability: f64,
}

impl FraudScore {
    pub fn new(is_fraud: bool, probability: f64) -> Result<Self, ScoringError> {
        if !(0.0..=1.0).contains(&probability) {
            return Err(ScoringError::InvalidProbability(probability));
        }
        Ok(Self { is_fraud, probability })
    }
}

/// Abstraction over the external fraud classifier.
pub trait FraudScorer: Send + Sync {
    fn score(&self, features: &FeatureVector) -> Result<FraudScore, ScoringError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn transfer() -> Transaction {
        Transaction {
            step: 7,
            kind: TransactionKind::Transfer,
            amount: 250.0,
            old_balance_origin: 1000.0,
            new_balance_origin: 750.0,
            old_balance_dest: 20.0,
            new_balance_dest: 270.0,
            is_flagged_fraud: 0,
            device_id: None,
            geo: None,
            bin: None,
        }
    }

    #[test]
    fn kind_encoding_is_alphabetical() {
        assert_eq!(TransactionKind::CashIn.encoded(), 0);
        assert_eq!(TransactionKind::CashOut.encoded(), 1);
        assert_eq!(TransactionKind::Transfer.encoded(), 4);
    }

    #[test]
    fn kind_roundtrip() {
        let kind = TransactionKind::from_str(&TransactionKind::CashOut.to_string()).unwrap();
        assert_eq!(kind, TransactionKind::CashOut);
        assert!(TransactionKind::from_str("REFUND").is_err());
    }

    #[test]
    fn features_include_balance_deltas() {
        let f = transfer().features().0;
        assert_eq!(f[0], 7.0);
        assert_eq!(f[1], 250.0);
        assert_eq!(f[6], 250.0);
        assert_eq!(f[7], 250.0);
        assert_eq!(f[8], 4.0);
        assert_eq!(f[9], 0.0);
    }

    #[test]
    fn deserializes_request_field_names() {
        let json = r#"{
            "step": 1, "type": "PAYMENT", "amount": 9.5,
            "oldbalanceOrg": 100.0, "newbalanceOrig": 90.5,
            "oldbalanceDest": 0.0, "newbalanceDest": 0.0,
            "isFlaggedFraud": 0, "BIN": "411111",
            "geo": {"lat": 24.86, "long": 67.0}
        }"#;
        let tx: Transaction = serde_json::from_str(json).unwrap();
        assert_eq!(tx.kind, TransactionKind::Payment);
        assert_eq!(tx.bin.as_deref(), Some("411111"));
        assert!(tx.device_id.is_none());
        assert_eq!(tx.features().0[8], 3.0);
    }

    #[test]
    fn score_rejects_out_of_range_probability() {
        assert!(FraudScore::new(false, 0.2).is_ok());
        assert!(matches!(
            FraudScore::new(true, 1.5),
            Err(ScoringError::InvalidProbability(_))
        ));
    }
}
