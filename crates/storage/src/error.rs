//! Storage error types.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to configure object store: {0}")]
    Config(String),

    #[error("Object store operation on {path} failed: {source}")]
    Store {
        path: String,
        #[source]
        source: object_store::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode dataset manifest: {0}")]
    Manifest(#[from] serde_json::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

impl StorageError {
    pub(crate) fn store(path: &str, source: object_store::Error) -> Self {
        StorageError::Store {
            path: path.to_string(),
            source,
        }
    }
}
