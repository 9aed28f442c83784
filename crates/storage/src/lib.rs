//! Storage for published forecast datasets.
//!
//! Provides:
//! - Object storage (S3, local filesystem, in-memory) behind one client
//! - The publishing target that recovers and replaces a dataset's resources

pub mod error;
pub mod object_store;
pub mod publisher;

pub use self::object_store::{ObjectStorage, ObjectStorageConfig};
pub use error::{StorageError, StorageResult};
pub use publisher::{
    DatasetPeriod, Publication, PublishedTable, PublishingTarget, Resource, StorePublisher,
};
