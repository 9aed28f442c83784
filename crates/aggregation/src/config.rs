//! Pipeline configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Settings the core needs for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// First issue year of the dataset
    pub min_year: i32,
    /// Where surfaces are written as GeoTIFFs
    pub scratch_dir: PathBuf,
    /// Where retrieved grid files are stored and looked up
    pub download_dir: PathBuf,
    /// Ignore published history and rebuild from `min_year`
    #[serde(default)]
    pub force_refresh: bool,
}

impl PipelineConfig {
    pub fn new(min_year: i32, scratch_dir: impl Into<PathBuf>) -> Self {
        let scratch_dir = scratch_dir.into();
        Self {
            min_year,
            download_dir: scratch_dir.clone(),
            scratch_dir,
            force_refresh: false,
        }
    }

    pub fn with_download_dir(mut self, download_dir: impl Into<PathBuf>) -> Self {
        self.download_dir = download_dir.into();
        self
    }

    pub fn with_force_refresh(mut self, force_refresh: bool) -> Self {
        self.force_refresh = force_refresh;
        self
    }
}
