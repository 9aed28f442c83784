//! Error types for the aggregation crate.

use thiserror::Error;

use forecast_common::CommonError;
use grid_decoder::DecodeError;
use raster::RasterError;
use storage::StorageError;
use zonal::ZonalError;

/// Failure of one grid retrieval request.
///
/// Never fatal to a run: the months of the request stay missing and are
/// requested again next time.
#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Job {id} failed: {reason}")]
    JobFailed { id: String, reason: String },

    #[error("Job {id} not finished after {polls} polls")]
    Timeout { id: String, polls: u32 },

    #[error("Unexpected response: {0}")]
    Response(String),

    #[error("Failed to write download: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure to turn one grid file into surfaces.
///
/// The file's contributions are skipped; the run continues.
#[derive(Error, Debug)]
pub enum MaterializeError {
    #[error("Failed to decode grid file: {0}")]
    Decode(#[from] DecodeError),

    #[error("Unsupported grid layout: {0}")]
    Layout(String),

    #[error("Invalid lead time: {0}")]
    LeadTime(#[from] CommonError),

    #[error("Invalid surface: {0}")]
    Raster(#[from] RasterError),
}

/// Errors that abort a pipeline run.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Boundary source unavailable: {0}")]
    Boundaries(#[from] ZonalError),

    #[error("Publishing target failed: {0}")]
    Storage(#[from] StorageError),

    #[error("Failed to write raster: {0}")]
    Raster(#[from] RasterError),

    #[error("Scratch directory I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode table: {0}")]
    Csv(#[from] csv::Error),

    #[error("Malformed recovered table {name}: {reason}")]
    RecoveredTable { name: String, reason: String },

    #[error("Failed to load country reference data: {0}")]
    CountryReference(String),
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
