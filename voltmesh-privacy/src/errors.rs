use thiserror::Error;

pub type PrivacyResult<T> = Result<T, PrivacyError>;

#[derive(Debug, Error)]
pub enum PrivacyError {
    #[error("epsilon must be > 0")]
    InvalidEpsilon,
    #[error("sensitivity must be positive")]
    InvalidSensitivity,
    #[error("noise standard deviation must be finite and >= 0")]
    InvalidNoise,
    #[error("unknown privacy tier `{0}`")]
    UnknownTier(String),
    #[error("secure aggregation requires at least one party")]
    EmptyAggregation,
    #[error("payload serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
