pub mod fraud;
pub mod money;

pub use fraud::{
    FeatureVector, FraudScore, FraudScorer, ScoringError, Transaction, TransactionKind,
    FEATURE_COUNT,
};
pub use money::Money;
