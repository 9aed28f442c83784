//! Error types for shared forecast types.

use thiserror::Error;

/// Result type alias using CommonError.
pub type CommonResult<T> = Result<T, CommonError>;

#[derive(Debug, Error)]
pub enum CommonError {
    #[error("Invalid period: {0}")]
    InvalidPeriod(String),

    #[error("Invalid lead time: {0} (expected 0-5)")]
    InvalidLeadTime(u8),

    #[error("Invalid lead-time step: {0} (expected 1-6)")]
    InvalidLeadStep(u8),
}
