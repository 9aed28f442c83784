//! Publishing target for the dataset's resources.

use std::collections::BTreeSet;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::error::StorageResult;
use crate::object_store::ObjectStorage;

/// Name of the manifest object written next to the resources.
pub const MANIFEST_NAME: &str = "dataset.json";

/// One named artifact to publish.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub name: String,
    pub description: String,
    pub bytes: Bytes,
}

/// A tabular resource currently published.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedTable {
    pub name: String,
    pub bytes: Bytes,
}

/// First and last day covered by the dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DatasetPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// The complete set of resources replacing the published dataset.
#[derive(Debug, Clone, Default)]
pub struct Publication {
    pub time_period: Option<DatasetPeriod>,
    pub resources: Vec<Resource>,
}

impl Publication {
    pub fn resource(&self, name: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.name == name)
    }
}

/// Stores published resources and serves them back for recovery.
#[async_trait]
pub trait PublishingTarget: Send + Sync {
    /// Every CSV resource currently published.
    async fn published_tables(&self) -> StorageResult<Vec<PublishedTable>>;

    /// Replace the published dataset with `publication`.
    async fn publish(&self, publication: &Publication) -> StorageResult<()>;
}

#[derive(Serialize)]
struct Manifest<'a> {
    time_period: Option<DatasetPeriod>,
    resources: Vec<ManifestEntry<'a>>,
}

#[derive(Serialize)]
struct ManifestEntry<'a> {
    name: &'a str,
    description: &'a str,
    size: usize,
}

/// Publishes resources as objects under `<prefix>/`.
pub struct StorePublisher {
    storage: ObjectStorage,
    prefix: String,
}

impl StorePublisher {
    pub fn new(storage: ObjectStorage, prefix: impl Into<String>) -> Self {
        Self {
            storage,
            prefix: prefix.into().trim_matches('/').to_string(),
        }
    }

    /// Names of every object currently under the prefix, manifest included.
    pub async fn resource_names(&self) -> StorageResult<Vec<String>> {
        Ok(self
            .storage
            .list(&self.prefix)
            .await?
            .iter()
            .filter_map(|path| self.resource_name(path))
            .map(String::from)
            .collect())
    }

    fn object_path(&self, name: &str) -> String {
        format!("{}/{}", self.prefix, name)
    }

    fn resource_name<'a>(&self, path: &'a str) -> Option<&'a str> {
        path.strip_prefix(&self.prefix)?.strip_prefix('/')
    }
}

#[async_trait]
impl PublishingTarget for StorePublisher {
    #[instrument(skip(self), fields(prefix = %self.prefix))]
    async fn published_tables(&self) -> StorageResult<Vec<PublishedTable>> {
        let mut tables = Vec::new();
        for path in self.storage.list(&self.prefix).await? {
            let Some(name) = self.resource_name(&path) else {
                continue;
            };
            if !name.ends_with(".csv") || name.contains('/') {
                continue;
            }
            let bytes = self.storage.get(&path).await?;
            tables.push(PublishedTable {
                name: name.to_string(),
                bytes,
            });
        }
        info!(tables = tables.len(), "Listed published tables");
        Ok(tables)
    }

    #[instrument(skip(self, publication), fields(prefix = %self.prefix, resources = publication.resources.len()))]
    async fn publish(&self, publication: &Publication) -> StorageResult<()> {
        for resource in &publication.resources {
            self.storage
                .put(&self.object_path(&resource.name), resource.bytes.clone())
                .await?;
        }

        let manifest = Manifest {
            time_period: publication.time_period,
            resources: publication
                .resources
                .iter()
                .map(|r| ManifestEntry {
                    name: &r.name,
                    description: &r.description,
                    size: r.bytes.len(),
                })
                .collect(),
        };
        let manifest = serde_json::to_vec_pretty(&manifest)?;
        self.storage
            .put(&self.object_path(MANIFEST_NAME), Bytes::from(manifest))
            .await?;

        let keep: BTreeSet<String> = publication
            .resources
            .iter()
            .map(|r| self.object_path(&r.name))
            .chain(std::iter::once(self.object_path(MANIFEST_NAME)))
            .collect();

        let mut removed = 0;
        for path in self.storage.list(&self.prefix).await? {
            if !keep.contains(&path) {
                warn!(path = %path, "Removing stale resource");
                self.storage.delete(&path).await?;
                removed += 1;
            }
        }

        info!(
            published = publication.resources.len(),
            removed = removed,
            "Published dataset resources"
        );
        Ok(())
    }
}
