//! Seasonal precipitation anomaly scraper.
//!
//! Extends the published anomaly dataset with the forecast issue periods it
//! does not cover yet:
//! - Recovers history from the published tables
//! - Retrieves missing months from the climate data store
//! - Aggregates each forecast over admin level 0 and 1 boundaries
//! - Publishes the merged tables and the latest rasters

mod cds;
mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::Parser;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use aggregation::{Collaborators, CountryTable, Pipeline, RunOutcome};
use grid_decoder::GribDecoder;
use storage::{ObjectStorage, StorePublisher};
use zonal::{CellCentreStatistics, GeoJsonBoundaries};

use cds::CdsClient;
use config::load_config;

#[derive(Parser, Debug)]
#[command(name = "precip-scraper")]
#[command(about = "Incremental seasonal precipitation anomaly aggregation")]
struct Args {
    /// Configuration file
    #[arg(short, long, env = "PRECIP_SCRAPER_CONFIG", default_value = "config/precip-scraper.yaml")]
    config: PathBuf,

    /// Ignore published history and rebuild from the configured first year
    #[arg(long)]
    force_refresh: bool,

    /// Run date (YYYY-MM-DD), defaults to today in UTC
    #[arg(long)]
    today: Option<NaiveDate>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = load_config(&args.config)?;
    if args.force_refresh {
        config.pipeline.force_refresh = true;
    }
    let today = args.today.unwrap_or_else(|| Utc::now().date_naive());

    info!(
        config = %args.config.display(),
        today = %today,
        dataset = %config.dataset.prefix,
        "Starting precipitation anomaly scraper"
    );

    let countries = CountryTable::from_csv_path(&config.countries.path)
        .with_context(|| format!("Failed to load countries from {:?}", config.countries.path))?;
    let storage =
        ObjectStorage::new(&config.storage).context("Failed to open publishing storage")?;

    let collaborators = Collaborators {
        retriever: Arc::new(CdsClient::new(config.cds.clone())?),
        decoder: Arc::new(GribDecoder::new()),
        boundaries: Arc::new(GeoJsonBoundaries::new(
            config.boundaries.adm0.clone(),
            config.boundaries.adm1.clone(),
        )),
        statistics: Arc::new(CellCentreStatistics::new()),
        countries: Arc::new(countries),
        target: Arc::new(StorePublisher::new(storage, config.dataset.prefix.clone())),
    };

    let pipeline = Pipeline::new(config.pipeline_config(), collaborators);
    match pipeline.run(today).await.context("Pipeline run failed")? {
        RunOutcome::NotUpdated => info!("Nothing new to publish"),
        RunOutcome::Published {
            publication,
            failed_years,
            ..
        } => {
            if !failed_years.is_empty() {
                warn!(years = ?failed_years, "Some years could not be retrieved and will be retried next run");
            }
            for resource in &publication.resources {
                info!(name = %resource.name, bytes = resource.bytes.len(), "Published resource");
            }
        }
    }

    Ok(())
}
