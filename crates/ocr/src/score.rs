use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use tillscan_core::{FraudScorer, Money, ScoringError, Transaction};
use tracing::{debug, instrument};

use crate::pipeline::{ExtractionFailure, ReceiptPipeline};
use crate::recognizer::OcrBackend;

#[derive(Debug, Clone, Deserialize)]
pub struct ScoreRequest {
    pub transaction: Transaction,
    pub receipt_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ScoreResponse {
    /// Probability of the fraud class.
    pub fraud_score: f64,
    pub merchant_name: String,
    pub total: Money,
}

#[derive(Debug, Error)]
pub enum ScoreError {
    #[error(transparent)]
    Receipt(#[from] ExtractionFailure),
    #[error(transparent)]
    Scoring(#[from] ScoringError),
}

impl ScoreError {
    /// Maps to a 4xx at an HTTP boundary; everything else is a server fault.
    pub fn is_client_error(&self) -> bool {
        match self {
            ScoreError::Receipt(e) => e.is_client_error(),
            ScoreError::Scoring(_) => false,
        }
    }
}

/// Scores a transaction and reads its receipt.
pub struct ReceiptScorer<R: OcrBackend, S: FraudScorer> {
    pipeline: ReceiptPipeline<R>,
    scorer: S,
}

impl<R: OcrBackend, S: FraudScorer> ReceiptScorer<R, S> {
    pub fn new(pipeline: ReceiptPipeline<R>, scorer: S) -> Self {
        Self { pipeline, scorer }
    }

    /// The transaction is scored before the receipt is read; the first failure wins.
    #[instrument(skip_all, fields(receipt = %request.receipt_path.display()))]
    pub fn score(&self, request: &ScoreRequest) -> Result<ScoreResponse, ScoreError> {
        let fraud = self.scorer.score(&request.transaction.features())?;
        debug!(probability = fraud.probability, is_fraud = fraud.is_fraud, "transaction scored");

        let receipt = self.pipeline.process(&request.receipt_path)?;
        Ok(ScoreResponse {
            fraud_score: fraud.probability,
            merchant_name: receipt.merchant_name,
            total: receipt.total,
        })
    }
}
