//! Configuration loading for the scraper.
//!
//! One YAML file with `${VAR}` and `${VAR:-default}` substitution from the
//! environment.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use aggregation::PipelineConfig;
use storage::ObjectStorageConfig;

/// Environment variable that overrides `cds.key`.
pub const CDS_KEY_VAR: &str = "CDS_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    pub cds: CdsConfig,
    pub pipeline: PipelineSection,
    pub boundaries: BoundariesConfig,
    pub countries: CountriesConfig,
    pub storage: ObjectStorageConfig,
    pub dataset: DatasetConfig,
}

/// Climate data store API access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CdsConfig {
    #[serde(default = "default_cds_url")]
    pub url: String,
    #[serde(default)]
    pub key: String,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_max_polls")]
    pub max_polls: u32,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_cds_url() -> String {
    "https://cds.climate.copernicus.eu/api".to_string()
}

fn default_poll_interval() -> u64 {
    10
}

fn default_max_polls() -> u32 {
    720
}

fn default_request_timeout() -> u64 {
    600
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSection {
    pub min_year: i32,
    pub scratch_dir: PathBuf,
    /// Where downloaded grid files are kept between runs
    #[serde(default)]
    pub saved_dir: Option<PathBuf>,
    #[serde(default)]
    pub force_refresh: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundariesConfig {
    pub adm0: PathBuf,
    pub adm1: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountriesConfig {
    /// CSV with columns `iso3,iso2,name,region`
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Object prefix the dataset's resources are published under
    pub prefix: String,
}

impl ScraperConfig {
    pub fn pipeline_config(&self) -> PipelineConfig {
        let config = PipelineConfig::new(self.pipeline.min_year, &self.pipeline.scratch_dir)
            .with_force_refresh(self.pipeline.force_refresh);
        match &self.pipeline.saved_dir {
            Some(saved_dir) => config.with_download_dir(saved_dir),
            None => config,
        }
    }
}

/// Load, expand and validate the configuration at `path`.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ScraperConfig> {
    let content = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("Failed to read config from {:?}", path.as_ref()))?;
    let mut config = parse_config(&content)?;

    if let Ok(key) = std::env::var(CDS_KEY_VAR) {
        if !key.is_empty() {
            config.cds.key = key;
        }
    }

    validate_config(&config)?;
    Ok(config)
}

fn parse_config(content: &str) -> Result<ScraperConfig> {
    let expanded = shellexpand::env(content).context("Failed to expand environment variables")?;
    serde_yaml::from_str(&expanded).context("Failed to parse config YAML")
}

fn validate_config(config: &ScraperConfig) -> Result<()> {
    anyhow::ensure!(
        !config.cds.key.is_empty(),
        "No CDS API key: set cds.key or {}",
        CDS_KEY_VAR
    );
    anyhow::ensure!(config.cds.max_polls > 0, "cds.max_polls must be positive");
    anyhow::ensure!(
        (1981..=2100).contains(&config.pipeline.min_year),
        "pipeline.min_year {} is outside the archive",
        config.pipeline.min_year
    );
    anyhow::ensure!(
        !config.dataset.prefix.trim_matches('/').is_empty(),
        "dataset.prefix cannot be empty"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
cds:
  key: "${PRECIP_TEST_KEY:-abc-123}"
  poll_interval_secs: 2
pipeline:
  min_year: 2017
  scratch_dir: /tmp/precip/scratch
  saved_dir: /tmp/precip/saved
boundaries:
  adm0: data/adm0.geojson
  adm1: data/adm1.geojson
countries:
  path: data/countries.csv
storage:
  kind: local
  root: /tmp/precip/published
dataset:
  prefix: ecmwf-anomalous-precipitation
"#;

    #[test]
    fn test_parse_sample_config() {
        std::env::remove_var("PRECIP_TEST_KEY");
        let config = parse_config(SAMPLE).unwrap();
        assert_eq!(config.cds.key, "abc-123");
        assert_eq!(config.cds.poll_interval_secs, 2);
        assert_eq!(config.cds.max_polls, 720);
        assert_eq!(config.cds.url, "https://cds.climate.copernicus.eu/api");
        assert!(matches!(config.storage, ObjectStorageConfig::Local { .. }));
        validate_config(&config).unwrap();

        let pipeline = config.pipeline_config();
        assert_eq!(pipeline.min_year, 2017);
        assert_eq!(pipeline.download_dir, PathBuf::from("/tmp/precip/saved"));
        assert!(!pipeline.force_refresh);
    }

    #[test]
    fn test_environment_substitution() {
        std::env::set_var("PRECIP_SUBST_KEY", "from-env");
        let config = parse_config(&SAMPLE.replace("PRECIP_TEST_KEY", "PRECIP_SUBST_KEY")).unwrap();
        assert_eq!(config.cds.key, "from-env");
    }

    #[test]
    fn test_download_dir_defaults_to_scratch() {
        let mut config = parse_config(SAMPLE).unwrap();
        config.pipeline.saved_dir = None;
        assert_eq!(
            config.pipeline_config().download_dir,
            PathBuf::from("/tmp/precip/scratch")
        );
    }

    #[test]
    fn test_shipped_config_parses() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config/precip-scraper.yaml");
        let content = std::fs::read_to_string(path).unwrap();
        let config = parse_config(&content).unwrap();
        assert_eq!(config.dataset.prefix, "ecmwf-anomalous-precipitation");
        assert!(matches!(config.storage, ObjectStorageConfig::S3 { .. }));
        assert!(config.pipeline.saved_dir.is_some());
    }

    #[test]
    fn test_validation_rejects_missing_key() {
        let mut config = parse_config(SAMPLE).unwrap();
        config.cds.key.clear();
        assert!(validate_config(&config).is_err());
    }
}
