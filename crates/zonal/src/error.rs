//! Error types for boundaries and zonal statistics.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ZonalError {
    #[error("Failed to read boundaries: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse boundaries: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Feature {index} is missing property '{property}'")]
    MissingProperty { index: usize, property: String },

    #[error("Invalid geometry in feature {index}: {reason}")]
    InvalidGeometry { index: usize, reason: String },
}

pub type ZonalResult<T> = std::result::Result<T, ZonalError>;
