//! Turns missing periods into retrieval requests and runs them.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use forecast_common::{Period, PeriodRange};

use crate::coverage::Coverage;
use crate::error::RetrievalError;
use crate::request::{GridRequest, GridRetriever};

/// A grid file available for materialization, with the request it answers.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisteredFile {
    pub path: PathBuf,
    pub request: GridRequest,
}

/// What a retrieval pass produced.
#[derive(Debug, Clone, Default)]
pub struct RetrievalOutcome {
    pub registered: Vec<RegisteredFile>,
    /// Years for which no file could be registered
    pub failed_years: Vec<i32>,
}

impl RetrievalOutcome {
    /// Whether any file was registered; gates all downstream processing.
    pub fn updated(&self) -> bool {
        !self.registered.is_empty()
    }
}

/// One request per year from `min_year` to the run period's year, covering
/// that year's missing months. Years with nothing missing are skipped.
pub fn plan_requests(coverage: &Coverage, min_year: i32, run_period: Period) -> Vec<GridRequest> {
    (min_year..=run_period.year())
        .filter_map(|year| {
            let end_month = if year == run_period.year() {
                run_period.month()
            } else {
                12
            };
            let range = PeriodRange::new(
                Period::new(year, 1).ok()?,
                Period::new(year, end_month).ok()?,
            );
            let months: Vec<u32> = coverage
                .missing_periods(range)
                .iter()
                .map(|p| p.month())
                .collect();
            if months.is_empty() {
                None
            } else {
                Some(GridRequest::new(year, months))
            }
        })
        .collect()
}

/// Runs planned requests against the retrieval service.
pub struct RetrievalPlanner<'a> {
    retriever: &'a dyn GridRetriever,
    download_dir: &'a Path,
}

impl<'a> RetrievalPlanner<'a> {
    pub fn new(retriever: &'a dyn GridRetriever, download_dir: &'a Path) -> Self {
        Self {
            retriever,
            download_dir,
        }
    }

    /// Retrieve every missing month from `min_year` up to `run_period`.
    ///
    /// Returns the coverage extended with the months that were registered.
    pub async fn retrieve_missing(
        &self,
        mut coverage: Coverage,
        min_year: i32,
        run_period: Period,
    ) -> (Coverage, RetrievalOutcome) {
        let mut outcome = RetrievalOutcome::default();

        for request in plan_requests(&coverage, min_year, run_period) {
            info!(
                year = request.year(),
                months = ?request.months(),
                "Requesting grid data"
            );

            let registered = match self.attempt(&request).await {
                Ok(file) => Some(file),
                Err(e) => {
                    warn!(year = request.year(), error = %e, "Retrieval failed");
                    self.retry_degraded(&request, run_period).await
                }
            };

            match registered {
                Some(file) => {
                    coverage.mark_covered(file.request.periods());
                    outcome.registered.push(file);
                }
                None => outcome.failed_years.push(request.year()),
            }
        }

        info!(
            registered = outcome.registered.len(),
            failed_years = ?outcome.failed_years,
            "Retrieval finished"
        );
        (coverage, outcome)
    }

    /// The single fallback: only for the current year, drop the latest
    /// month, which may not be published upstream yet.
    async fn retry_degraded(&self, request: &GridRequest, run_period: Period) -> Option<RegisteredFile> {
        if request.year() != run_period.year() {
            return None;
        }
        let degraded = request.without_latest_month()?;

        info!(
            year = degraded.year(),
            months = ?degraded.months(),
            "Retrying without latest month"
        );
        match self.attempt(&degraded).await {
            Ok(file) => Some(file),
            Err(e) => {
                warn!(
                    year = degraded.year(),
                    error = %e,
                    "Degraded retrieval failed, months stay missing"
                );
                None
            }
        }
    }

    async fn attempt(&self, request: &GridRequest) -> Result<RegisteredFile, RetrievalError> {
        let path = self.download_dir.join(request.target_file_name());

        if path.exists() {
            info!(path = %path.display(), "Grid file already present locally, skipping retrieval");
        } else {
            self.retriever.retrieve(request, &path).await?;
        }

        Ok(RegisteredFile {
            path,
            request: request.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(year: i32, month: u32) -> Period {
        Period::new(year, month).unwrap()
    }

    #[test]
    fn test_plan_bounds_months_per_year() {
        let requests = plan_requests(&Coverage::default(), 2024, p(2025, 3));
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].year(), 2024);
        assert_eq!(requests[0].months(), (1..=12).collect::<Vec<_>>().as_slice());
        assert_eq!(requests[1].months(), &[1, 2, 3]);
    }

    #[test]
    fn test_plan_skips_covered_years() {
        let coverage = Coverage::new(PeriodRange::new(p(2024, 1), p(2025, 2)).iter());
        let requests = plan_requests(&coverage, 2024, p(2025, 3));
        assert_eq!(requests, vec![GridRequest::new(2025, [3])]);

        let coverage = Coverage::new(PeriodRange::new(p(2024, 1), p(2025, 3)).iter());
        assert!(plan_requests(&coverage, 2024, p(2025, 3)).is_empty());
    }

    #[test]
    fn test_plan_requests_gaps_only() {
        let coverage = Coverage::new([p(2024, 1), p(2024, 3), p(2024, 4)]);
        let requests = plan_requests(&coverage, 2024, p(2024, 5));
        assert_eq!(requests, vec![GridRequest::new(2024, [2, 5])]);
    }
}
