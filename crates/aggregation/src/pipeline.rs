//! One incremental run: recover, retrieve, aggregate, merge, publish.

use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{error, info, warn};

use forecast_common::Period;
use grid_decoder::GridDecoder;
use raster::Surface;
use storage::{Publication, PublishingTarget};
use zonal::{AdminBoundaries, BoundarySource, ZonalStatistics};

use crate::aggregator::{StatRow, ZonalAggregator};
use crate::config::PipelineConfig;
use crate::country::{CountryReference, CountryResolver, RegionIndex};
use crate::coverage::Coverage;
use crate::error::{MaterializeError, Result};
use crate::history::History;
use crate::materializer::Materializer;
use crate::partition::Router;
use crate::planner::{RetrievalOutcome, RetrievalPlanner};
use crate::publication::build_publication;
use crate::recovery::recover;
use crate::request::GridRetriever;

/// External services the pipeline talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub retriever: Arc<dyn GridRetriever>,
    pub decoder: Arc<dyn GridDecoder>,
    pub boundaries: Arc<dyn BoundarySource>,
    pub statistics: Arc<dyn ZonalStatistics>,
    pub countries: Arc<dyn CountryReference>,
    pub target: Arc<dyn PublishingTarget>,
}

/// How a run ended.
#[derive(Debug)]
pub enum RunOutcome {
    /// No new grid file was registered; nothing was published
    NotUpdated,
    Published {
        history: History,
        publication: Publication,
        /// Years whose missing months are requested again next run
        failed_years: Vec<i32>,
    },
}

impl RunOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self, RunOutcome::Published { .. })
    }
}

/// Incremental aggregation pipeline.
pub struct Pipeline {
    config: PipelineConfig,
    collaborators: Collaborators,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, collaborators: Collaborators) -> Self {
        Self {
            config,
            collaborators,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run for the month containing `today`.
    pub async fn run(&self, today: NaiveDate) -> Result<RunOutcome> {
        let run_period = Period::from_date(today);
        info!(
            run_period = %run_period,
            min_year = self.config.min_year,
            force_refresh = self.config.force_refresh,
            "Starting pipeline run"
        );

        tokio::fs::create_dir_all(&self.config.scratch_dir).await?;
        tokio::fs::create_dir_all(&self.config.download_dir).await?;

        let regions = RegionIndex::from_reference(self.collaborators.countries.as_ref());
        let router = Router::new(run_period, &regions);

        let history = if self.config.force_refresh {
            info!("Force refresh requested, ignoring published history");
            History::new()
        } else {
            recover(self.collaborators.target.as_ref(), &router).await?
        };

        let coverage = Coverage::new(history.known_periods());
        let planner = RetrievalPlanner::new(
            self.collaborators.retriever.as_ref(),
            &self.config.download_dir,
        );
        let (_, retrieval) = planner
            .retrieve_missing(coverage, self.config.min_year, run_period)
            .await;

        if !retrieval.updated() {
            info!(run_period = %run_period, "Data has not been updated");
            return Ok(RunOutcome::NotUpdated);
        }

        let boundaries = AdminBoundaries::load(self.collaborators.boundaries.as_ref())?;
        let (new_rows, latest) = self.aggregate_files(&retrieval, &boundaries)?;
        if latest.is_empty() {
            warn!("No surfaces materialized from registered files, data has not been updated");
            return Ok(RunOutcome::NotUpdated);
        }

        let history = history.merge_all(router.route(new_rows));
        let publication = build_publication(&history, &latest)?;
        self.collaborators.target.publish(&publication).await?;

        info!(
            resources = publication.resources.len(),
            rows = history.row_count(),
            "Published dataset"
        );
        Ok(RunOutcome::Published {
            history,
            publication,
            failed_years: retrieval.failed_years,
        })
    }

    /// New rows of every registered file, in file then surface order, and
    /// the surfaces of the latest issue period seen.
    fn aggregate_files(
        &self,
        retrieval: &RetrievalOutcome,
        boundaries: &AdminBoundaries,
    ) -> Result<(Vec<StatRow>, Vec<Surface>)> {
        let materializer = Materializer::new(
            self.collaborators.decoder.as_ref(),
            &self.config.scratch_dir,
        );
        let mut aggregator = ZonalAggregator::new(
            boundaries,
            self.collaborators.statistics.as_ref(),
            CountryResolver::new(self.collaborators.countries.as_ref()),
        );

        let mut rows = Vec::new();
        let mut latest: Vec<Surface> = Vec::new();
        for file in &retrieval.registered {
            let surfaces = match materializer.materialize(file) {
                Ok(surfaces) => surfaces,
                Err(e) => {
                    error!(path = %file.path.display(), error = %e, "Failed to materialize grid file, skipping");
                    if matches!(e, MaterializeError::Decode(_)) {
                        discard(&file.path);
                    }
                    continue;
                }
            };

            for mut surface in surfaces {
                materializer.write(&mut surface)?;
                rows.extend(aggregator.aggregate(&surface));
                keep_latest(&mut latest, surface);
            }
        }

        info!(rows = rows.len(), "Aggregated registered files");
        Ok((rows, latest))
    }
}

/// Remove an undecodable download so the next run retrieves it again
/// instead of reusing it.
fn discard(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => warn!(path = %path.display(), "Removed undecodable grid file"),
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove undecodable grid file"),
    }
}

/// Keep only surfaces of the maximum issue period seen so far.
fn keep_latest(latest: &mut Vec<Surface>, surface: Surface) {
    match latest.first().map(|s| s.issue) {
        Some(issue) if surface.issue < issue => {}
        Some(issue) if surface.issue > issue => {
            latest.clear();
            latest.push(surface);
        }
        _ => latest.push(surface),
    }
}
