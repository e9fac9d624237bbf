use thiserror::Error;

/// Validation and contract errors exposed by `funddb-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("fund id cannot be empty")]
    EmptyFundId,

    #[error("invalid fetch ID, required format \"{{scheme}}:{{code}}\": '{value}'")]
    InvalidFetchId { value: String },
    #[error("unknown scheme: '{value}'")]
    UnknownScheme { value: String },
    #[error("invalid code type '{value}', expected one of fund_cd, association_fund_cd, isin_cd")]
    InvalidCodeType { value: String },

    #[error("close hour must be between 0 and 23: {hour}")]
    InvalidCloseHour { hour: u8 },
    #[error("batch size must be greater than zero")]
    InvalidBatchSize,
    #[error("timeout must be greater than zero")]
    InvalidTimeout,
}
