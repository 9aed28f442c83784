//! Object storage interface for published resources (S3 compatible, local or in-memory).

use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use object_store::{
    aws::AmazonS3Builder, local::LocalFileSystem, memory::InMemory, path::Path, ObjectStore,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::{StorageError, StorageResult};

/// Configuration for the object storage backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ObjectStorageConfig {
    S3 {
        /// S3/MinIO endpoint URL
        endpoint: String,
        bucket: String,
        access_key_id: String,
        secret_access_key: String,
        /// AWS region (use "us-east-1" for MinIO)
        #[serde(default = "default_region")]
        region: String,
        /// Allow HTTP (for local MinIO)
        #[serde(default)]
        allow_http: bool,
    },
    /// Directory on the local filesystem, created if missing.
    Local { root: PathBuf },
    /// Process-local store, lost on exit.
    Memory,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

/// Object storage client.
#[derive(Clone)]
pub struct ObjectStorage {
    store: Arc<dyn ObjectStore>,
    location: String,
}

impl ObjectStorage {
    /// Create a new object storage client from config.
    pub fn new(config: &ObjectStorageConfig) -> StorageResult<Self> {
        match config {
            ObjectStorageConfig::S3 {
                endpoint,
                bucket,
                access_key_id,
                secret_access_key,
                region,
                allow_http,
            } => {
                let mut builder = AmazonS3Builder::new()
                    .with_endpoint(endpoint)
                    .with_bucket_name(bucket)
                    .with_access_key_id(access_key_id)
                    .with_secret_access_key(secret_access_key)
                    .with_region(region);

                if *allow_http {
                    builder = builder.with_allow_http(true);
                }

                let store = builder.build().map_err(|e| {
                    StorageError::Config(format!("Failed to create S3 client: {}", e))
                })?;

                Ok(Self {
                    store: Arc::new(store),
                    location: format!("s3://{}", bucket),
                })
            }
            ObjectStorageConfig::Local { root } => Self::local(root.clone()),
            ObjectStorageConfig::Memory => Ok(Self::in_memory()),
        }
    }

    pub fn local(root: PathBuf) -> StorageResult<Self> {
        std::fs::create_dir_all(&root)?;
        let store = LocalFileSystem::new_with_prefix(&root).map_err(|e| {
            StorageError::Config(format!("Invalid local root {}: {}", root.display(), e))
        })?;
        Ok(Self {
            store: Arc::new(store),
            location: root.display().to_string(),
        })
    }

    pub fn in_memory() -> Self {
        Self {
            store: Arc::new(InMemory::new()),
            location: "memory".to_string(),
        }
    }

    /// Write bytes to a path.
    #[instrument(skip(self, data), fields(store = %self.location, path = %path))]
    pub async fn put(&self, path: &str, data: Bytes) -> StorageResult<()> {
        let location = Path::from(path);
        debug!(size = data.len(), "Writing object");

        self.store
            .put(&location, data.into())
            .await
            .map_err(|e| StorageError::store(path, e))?;

        Ok(())
    }

    /// Read bytes from a path.
    #[instrument(skip(self), fields(store = %self.location, path = %path))]
    pub async fn get(&self, path: &str) -> StorageResult<Bytes> {
        let location = Path::from(path);

        let result = self
            .store
            .get(&location)
            .await
            .map_err(|e| StorageError::store(path, e))?;

        let bytes = result
            .bytes()
            .await
            .map_err(|e| StorageError::store(path, e))?;

        debug!(size = bytes.len(), "Read object");
        Ok(bytes)
    }

    /// Check if an object exists.
    pub async fn exists(&self, path: &str) -> StorageResult<bool> {
        let location = Path::from(path);

        match self.store.head(&location).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(StorageError::store(path, e)),
        }
    }

    /// List objects with a given prefix, sorted by path.
    pub async fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        use futures::TryStreamExt;

        let prefix_path = Path::from(prefix);
        let mut paths = Vec::new();

        let mut stream = self.store.list(Some(&prefix_path));
        while let Some(meta) = stream
            .try_next()
            .await
            .map_err(|e| StorageError::store(prefix, e))?
        {
            paths.push(meta.location.to_string());
        }

        paths.sort();
        Ok(paths)
    }

    /// Delete an object.
    #[instrument(skip(self), fields(store = %self.location, path = %path))]
    pub async fn delete(&self, path: &str) -> StorageResult<()> {
        let location = Path::from(path);

        self.store
            .delete(&location)
            .await
            .map_err(|e| StorageError::store(path, e))?;

        Ok(())
    }
}
