//! Error types for raster handling.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RasterError {
    #[error("Failed to write raster: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid raster grid: {0}")]
    InvalidGrid(String),

    #[error("Failed to build archive: {0}")]
    Archive(#[from] zip::result::ZipError),
}

pub type RasterResult<T> = std::result::Result<T, RasterError>;
