//! Fakes and fixtures shared by the pipeline integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use aggregation::{
    Collaborators, CountryTable, GridRequest, GridRetriever, Pipeline, PipelineConfig,
    RetrievalError,
};
use forecast_common::Period;
use grid_decoder::{DecodeError, DecodeResult, DecodedGrid, GridDecoder};
use storage::{ObjectStorage, PublishingTarget, StorePublisher};
use test_utils::{feature_collection, global_axes, rectangle_feature, write_fixture, COUNTRY_TABLE_CSV};
use zonal::{CellCentreStatistics, GeoJsonBoundaries};

/// Constant anomaly rate of every fake field, in m/s.
pub const FAKE_RATE: f32 = 1e-8;

/// Grid resolution of fake files, in degrees.
pub const FAKE_RESOLUTION: f64 = 10.0;

/// Placeholder contents naming the issue periods a fake file holds.
pub fn placeholder(year: i32, months: &[u32]) -> String {
    let months: Vec<String> = months.iter().map(|m| m.to_string()).collect();
    format!("{}:{}", year, months.join(","))
}

/// Retriever that writes placeholder files and records every request.
pub struct ScriptedRetriever {
    requests: Mutex<Vec<GridRequest>>,
    failures: Mutex<Vec<GridRequest>>,
    failing_years: Mutex<Vec<i32>>,
}

impl ScriptedRetriever {
    pub fn new() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            failures: Mutex::new(Vec::new()),
            failing_years: Mutex::new(Vec::new()),
        }
    }

    /// Fail this exact request.
    pub fn fail_request(&self, request: GridRequest) {
        self.failures.lock().unwrap().push(request);
    }

    /// Fail every request for `year`.
    pub fn fail_year(&self, year: i32) {
        self.failing_years.lock().unwrap().push(year);
    }

    pub fn heal(&self) {
        self.failures.lock().unwrap().clear();
        self.failing_years.lock().unwrap().clear();
    }

    pub fn requests(&self) -> Vec<GridRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn clear_requests(&self) {
        self.requests.lock().unwrap().clear();
    }
}

#[async_trait]
impl GridRetriever for ScriptedRetriever {
    async fn retrieve(&self, request: &GridRequest, target: &Path) -> Result<(), RetrievalError> {
        self.requests.lock().unwrap().push(request.clone());

        let fails = self.failures.lock().unwrap().contains(request)
            || self.failing_years.lock().unwrap().contains(&request.year());
        if fails {
            return Err(RetrievalError::Http {
                status: 400,
                url: format!("fake://{}", request.year()),
            });
        }

        std::fs::write(target, placeholder(request.year(), request.months()))?;
        Ok(())
    }
}

/// Decoder reading placeholder files into constant global grids.
///
/// A file whose contents do not parse as a placeholder is malformed.
pub struct PlaceholderDecoder;

impl GridDecoder for PlaceholderDecoder {
    fn decode(&self, path: &Path) -> DecodeResult<DecodedGrid> {
        let contents = std::fs::read_to_string(path)?;
        let malformed = || DecodeError::Malformed(path.display().to_string());

        let (year, months) = contents.trim().split_once(':').ok_or_else(malformed)?;
        let year: i32 = year.parse().map_err(|_| malformed())?;

        let (latitudes, longitudes) = global_axes(FAKE_RESOLUTION);
        let cells = latitudes.len() * longitudes.len();
        let mut grid = DecodedGrid::new(latitudes, longitudes);
        for month in months.split(',') {
            let month: u32 = month.parse().map_err(|_| malformed())?;
            let issue = Period::new(year, month)?;
            for step in 1..=6 {
                grid.insert(issue, step, vec![FAKE_RATE; cells])?;
            }
        }
        Ok(grid)
    }
}

/// Kenya and Afghanistan at level 0, three districts at level 1.
///
/// Rectangles are offset by half a cell so no cell centre sits on an edge.
pub fn write_boundaries(dir: &Path) -> (PathBuf, PathBuf) {
    let adm0 = feature_collection(&[
        rectangle_feature(
            &[("adm0_pcode", "KE"), ("adm0_name", "Kenya")],
            (25.0, -15.0, 45.0, 15.0),
        ),
        rectangle_feature(
            &[("adm0_pcode", "AF"), ("adm0_name", "Afghanistan")],
            (55.0, 25.0, 75.0, 45.0),
        ),
    ]);
    let adm1 = feature_collection(&[
        rectangle_feature(
            &[("adm0_pcode", "KE"), ("adm1_pcode", "KE01"), ("adm1_name", "Western")],
            (25.0, -15.0, 35.0, 15.0),
        ),
        rectangle_feature(
            &[("adm0_pcode", "KE"), ("adm1_pcode", "KE02"), ("adm1_name", "Eastern")],
            (35.0, -15.0, 45.0, 15.0),
        ),
        rectangle_feature(
            &[("adm0_pcode", "AF"), ("adm1_pcode", "AF01"), ("adm1_name", "Kabul")],
            (55.0, 25.0, 75.0, 45.0),
        ),
    ]);
    (
        write_fixture(dir, "adm0.geojson", &adm0),
        write_fixture(dir, "adm1.geojson", &adm1),
    )
}

/// A scratch workspace, an in-memory dataset and the fakes wired to it.
pub struct Harness {
    pub dir: TempDir,
    pub retriever: Arc<ScriptedRetriever>,
    pub publisher: Arc<StorePublisher>,
    boundaries: (PathBuf, PathBuf),
}

impl Harness {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let boundaries = write_boundaries(dir.path());
        Self {
            retriever: Arc::new(ScriptedRetriever::new()),
            publisher: Arc::new(StorePublisher::new(ObjectStorage::in_memory(), "precipitation")),
            boundaries,
            dir,
        }
    }

    pub fn download_dir(&self) -> PathBuf {
        self.dir.path().join("downloads")
    }

    pub fn config(&self, min_year: i32) -> PipelineConfig {
        PipelineConfig::new(min_year, self.dir.path().join("scratch"))
            .with_download_dir(self.download_dir())
    }

    pub fn pipeline(&self, config: PipelineConfig) -> Pipeline {
        let countries = CountryTable::from_csv_reader(COUNTRY_TABLE_CSV.as_bytes()).unwrap();
        Pipeline::new(
            config,
            Collaborators {
                retriever: self.retriever.clone(),
                decoder: Arc::new(PlaceholderDecoder),
                boundaries: Arc::new(GeoJsonBoundaries::new(
                    self.boundaries.0.clone(),
                    self.boundaries.1.clone(),
                )),
                statistics: Arc::new(CellCentreStatistics::new()),
                countries: Arc::new(countries),
                target: self.publisher.clone(),
            },
        )
    }

    /// Currently published tables by name.
    pub async fn published_tables(&self) -> Vec<(String, Vec<u8>)> {
        let mut tables: Vec<(String, Vec<u8>)> = self
            .publisher
            .published_tables()
            .await
            .unwrap()
            .into_iter()
            .map(|t| (t.name, t.bytes.to_vec()))
            .collect();
        tables.sort();
        tables
    }

    /// Every object under the dataset prefix.
    pub async fn published_names(&self) -> Vec<String> {
        self.publisher.resource_names().await.unwrap()
    }
}

pub fn date(year: i32, month: u32, day: u32) -> chrono::NaiveDate {
    chrono::NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub fn period(year: i32, month: u32) -> Period {
    Period::new(year, month).unwrap()
}
