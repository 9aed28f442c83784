//! Incremental aggregation of seasonal precipitation anomaly forecasts.
//!
//! Each run extends the published history by the issue periods it does not
//! cover yet:
//!
//! 1. [`recovery`] rebuilds per-partition [`History`] from published tables
//! 2. [`coverage`] and [`planner`] request the missing months, one request per year
//! 3. [`materializer`] decodes each registered file into north-up surfaces
//! 4. [`aggregator`] computes statistics rows per admin unit
//! 5. [`partition`] routes rows into partitions and [`history`] appends them
//! 6. [`publication`] encodes tables and the latest raster archive
//!
//! Re-running against unchanged published history requests nothing and
//! publishes nothing.

pub mod aggregator;
pub mod config;
pub mod country;
pub mod coverage;
pub mod error;
pub mod history;
pub mod materializer;
pub mod partition;
pub mod pipeline;
pub mod planner;
pub mod publication;
pub mod recovery;
pub mod request;
pub mod table;

pub use aggregator::{StatRow, ZonalAggregator};
pub use config::PipelineConfig;
pub use country::{CountryRecord, CountryReference, CountryResolver, CountryTable, RegionIndex};
pub use coverage::Coverage;
pub use error::{MaterializeError, PipelineError, Result, RetrievalError};
pub use history::History;
pub use materializer::Materializer;
pub use partition::{Partition, Router};
pub use pipeline::{Collaborators, Pipeline, RunOutcome};
pub use planner::{RegisteredFile, RetrievalOutcome, RetrievalPlanner};
pub use publication::build_publication;
pub use request::{GridRequest, GridRetriever};
