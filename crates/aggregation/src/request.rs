//! Grid retrieval requests and the retrieval service seam.

use std::collections::BTreeSet;
use std::path::Path;

use async_trait::async_trait;
use serde::{Serialize, Serializer};

use forecast_common::{Period, LEAD_TIME_STEPS};

use crate::error::RetrievalError;

/// Archive dataset holding the post-processed seasonal fields.
pub const DATASET: &str = "seasonal-postprocessed-single-levels";
pub const VARIABLE: &str = "total_precipitation_anomalous_rate_of_accumulation";
pub const ORIGINATING_CENTRE: &str = "ecmwf";
pub const SYSTEM: &str = "51";
pub const PRODUCT_TYPE: &str = "ensemble_mean";
pub const DATA_FORMAT: &str = "grib";

/// One retrieval covering some months of a single issue year.
///
/// Months are kept ascending. Serializes to the archive's request shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridRequest {
    year: i32,
    months: Vec<u32>,
}

impl GridRequest {
    pub fn new(year: i32, months: impl IntoIterator<Item = u32>) -> Self {
        let months: BTreeSet<u32> = months.into_iter().collect();
        Self {
            year,
            months: months.into_iter().collect(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn months(&self) -> &[u32] {
        &self.months
    }

    /// The same request minus its most recent month, unless that leaves nothing.
    pub fn without_latest_month(&self) -> Option<GridRequest> {
        let months = &self.months[..self.months.len().saturating_sub(1)];
        if months.is_empty() {
            return None;
        }
        Some(GridRequest {
            year: self.year,
            months: months.to_vec(),
        })
    }

    /// Issue periods the request asks for.
    pub fn periods(&self) -> BTreeSet<Period> {
        self.months
            .iter()
            .filter_map(|month| Period::new(self.year, *month).ok())
            .collect()
    }

    /// Local file name for the request's download.
    ///
    /// Includes the month list so a file left over from a request for other
    /// months of the same year is never mistaken for this one.
    pub fn target_file_name(&self) -> String {
        let months: Vec<String> = self.months.iter().map(|m| format!("{:02}", m)).collect();
        format!("{}_{}_{}.grib", VARIABLE, self.year, months.join("-"))
    }
}

#[derive(Serialize)]
struct WireRequest<'a> {
    originating_centre: &'a str,
    system: &'a str,
    variable: [&'a str; 1],
    product_type: [&'a str; 1],
    year: String,
    month: Vec<String>,
    leadtime_month: Vec<String>,
    data_format: &'a str,
}

impl Serialize for GridRequest {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        WireRequest {
            originating_centre: ORIGINATING_CENTRE,
            system: SYSTEM,
            variable: [VARIABLE],
            product_type: [PRODUCT_TYPE],
            year: self.year.to_string(),
            month: self.months.iter().map(|m| m.to_string()).collect(),
            leadtime_month: LEAD_TIME_STEPS.iter().map(|s| s.to_string()).collect(),
            data_format: DATA_FORMAT,
        }
        .serialize(serializer)
    }
}

/// Fetches the grid file for a request.
#[async_trait]
pub trait GridRetriever: Send + Sync {
    /// Retrieve `request` into `target`. `target` must only exist afterwards
    /// if the retrieval completed.
    async fn retrieve(&self, request: &GridRequest, target: &Path)
        -> Result<(), RetrievalError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_shape() {
        let request = GridRequest::new(2025, [3, 1, 2]);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "originating_centre": "ecmwf",
                "system": "51",
                "variable": ["total_precipitation_anomalous_rate_of_accumulation"],
                "product_type": ["ensemble_mean"],
                "year": "2025",
                "month": ["1", "2", "3"],
                "leadtime_month": ["1", "2", "3", "4", "5", "6"],
                "data_format": "grib"
            })
        );
    }

    #[test]
    fn test_without_latest_month() {
        let request = GridRequest::new(2025, [1, 2, 3]);
        let degraded = request.without_latest_month().unwrap();
        assert_eq!(degraded.months(), &[1, 2]);
        assert_eq!(degraded.year(), 2025);

        assert_eq!(GridRequest::new(2025, [1]).without_latest_month(), None);
    }

    #[test]
    fn test_target_file_name_is_request_scoped() {
        let full = GridRequest::new(2025, [1, 2, 3]);
        let degraded = full.without_latest_month().unwrap();
        assert_eq!(
            full.target_file_name(),
            "total_precipitation_anomalous_rate_of_accumulation_2025_01-02-03.grib"
        );
        assert_ne!(full.target_file_name(), degraded.target_file_name());
    }

    #[test]
    fn test_periods() {
        let periods = GridRequest::new(2024, [11, 12]).periods();
        assert_eq!(
            periods.into_iter().map(|p| p.to_string()).collect::<Vec<_>>(),
            vec!["2024-11", "2024-12"]
        );
    }
}
