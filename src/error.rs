use chrono::NaiveDate;
use thiserror::Error;

/// Precondition violations raised by the scoring and simulation core.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("indicator {indicator_id} on {date} has non-finite value {value}")]
    NonFiniteValue {
        indicator_id: String,
        date: NaiveDate,
        value: f64,
    },
    #[error("indicator {indicator_id} appears more than once in the latest snapshot")]
    DuplicateLatest { indicator_id: String },
    #[error("{name} must be finite, got {value}")]
    NonFiniteParameter { name: &'static str, value: f64 },
    #[error("category weights must be non-negative and sum to 1.0, got sum {sum}")]
    InvalidWeights { sum: f64 },
    #[error("unknown category {0:?}")]
    UnknownCategory(String),
}
