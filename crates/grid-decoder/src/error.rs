//! Error types for grid decoding.

use thiserror::Error;

use forecast_common::{CommonError, Period};

/// Errors that can occur while decoding a grid file.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Failed to read grid file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed grid file: {0}")]
    Malformed(String),

    #[error("Invalid time metadata: {0}")]
    Time(#[from] CommonError),

    #[error("Field size mismatch: expected {expected} values, got {actual}")]
    FieldSize { expected: usize, actual: usize },

    #[error("Duplicate field for issue {issue} step {step}")]
    DuplicateField { issue: Period, step: u8 },

    #[error("Irregular grid: {0}")]
    IrregularGrid(String),

    #[error("No fields in grid file: {0}")]
    Empty(String),
}

/// Result type for decoding operations.
pub type DecodeResult<T> = std::result::Result<T, DecodeError>;
