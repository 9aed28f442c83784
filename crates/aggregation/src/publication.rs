//! Assembles the resources handed to the publishing target.

use bytes::Bytes;
use chrono::NaiveDate;
use tracing::{debug, info};

use forecast_common::Period;
use raster::{bundle_rasters, encode_geotiff, Surface};
use storage::{DatasetPeriod, Publication, Resource};

use crate::error::Result;
use crate::history::History;
use crate::partition::{Partition, RESOURCE_PREFIX};
use crate::table::encode_table;

pub const RASTER_ARCHIVE_PREFIX: &str = "forecast_precipitation_anomalies_geotiff_";

/// First day of the earliest to last day of the latest issue period in `adm0`.
pub fn dataset_period(history: &History) -> Option<DatasetPeriod> {
    let periods = history.known_periods();
    let first = periods.first()?;
    let last = periods.last()?;
    Some(DatasetPeriod {
        start: first.first_day(),
        end: last.last_day(),
    })
}

/// `latin_america` becomes `Latin America`.
fn region_title(key: &str) -> String {
    key.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

fn iso_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn table_description(partition: &Partition, period: Option<DatasetPeriod>) -> String {
    let mut description = format!(
        "Summarized forecast precipitation anomalies data at adm{}",
        partition.admin_level()
    );
    if let Some(period) = period {
        description.push_str(&format!(
            " from {} to {}",
            iso_date(period.start),
            iso_date(period.end)
        ));
    }
    if let Partition::Admin1Region(region) = partition {
        description.push_str(&format!(" for {}", region_title(region)));
    }
    description
}

/// e.g. `forecast_precipitation_anomalies_geotiff_2025_03.zip`
pub fn raster_archive_name(issue: Period) -> String {
    format!(
        "{}{:04}_{:02}.zip",
        RASTER_ARCHIVE_PREFIX,
        issue.year(),
        issue.month()
    )
}

pub fn raster_archive_description(issue: Period) -> String {
    format!("Latest forecast precipitation anomalies raster data from {}", issue)
}

/// Surfaces of the maximum issue period, ordered by lead time.
pub fn latest_surfaces(surfaces: &[Surface]) -> Option<(Period, Vec<&Surface>)> {
    let latest = surfaces.iter().map(|s| s.issue).max()?;
    let mut selected: Vec<&Surface> = surfaces.iter().filter(|s| s.issue == latest).collect();
    selected.sort_by_key(|s| s.lead_time);
    Some((latest, selected))
}

/// GeoTIFF bytes of a surface, from its scratch file when it has one.
fn raster_bytes(surface: &Surface) -> Result<Vec<u8>> {
    match &surface.path {
        Some(path) => Ok(std::fs::read(path)?),
        None => Ok(encode_geotiff(&surface.grid, surface.crs)?),
    }
}

fn raster_archive(surfaces: &[Surface]) -> Result<Option<Resource>> {
    let Some((issue, latest)) = latest_surfaces(surfaces) else {
        return Ok(None);
    };
    let entries = latest
        .iter()
        .map(|surface| Ok((surface.file_name(), raster_bytes(surface)?)))
        .collect::<Result<Vec<_>>>()?;
    let archive = bundle_rasters(&entries)?;

    debug!(issue = %issue, rasters = entries.len(), "Bundled latest rasters");
    Ok(Some(Resource {
        name: raster_archive_name(issue),
        description: raster_archive_description(issue),
        bytes: Bytes::from(archive),
    }))
}

/// One sorted table per partition, then the latest raster archive.
pub fn build_publication(history: &History, surfaces: &[Surface]) -> Result<Publication> {
    let time_period = dataset_period(history);

    let mut resources = Vec::new();
    for (partition, rows) in history.tables() {
        let bytes = encode_table(rows, partition.admin_level())?;
        resources.push(Resource {
            name: partition.resource_name(),
            description: table_description(partition, time_period),
            bytes: Bytes::from(bytes),
        });
    }
    if let Some(archive) = raster_archive(surfaces)? {
        resources.push(archive);
    }

    info!(
        resources = resources.len(),
        prefix = RESOURCE_PREFIX,
        "Built publication"
    );
    Ok(Publication {
        time_period,
        resources,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::StatRow;
    use forecast_common::{CrsCode, LeadTime};
    use raster::RasterGrid;
    use std::io::Read;
    use test_utils::create_constant_grid;
    use zonal::AdminLevel;

    fn p(year: i32, month: u32) -> Period {
        Period::new(year, month).unwrap()
    }

    fn row(issue: Period) -> StatRow {
        let lead_time = LeadTime::new(2).unwrap();
        StatRow {
            iso_code: Some("AFG".into()),
            adm0_name: Some("Afghanistan".into()),
            adm1_pcode: None,
            adm1_name: None,
            admin_level: AdminLevel::Adm0,
            issue,
            lead_time,
            valid: lead_time.valid_period(issue),
            pixel_count: 9.0,
            mean_anomaly: Some(2.0),
            median_anomaly: Some(2.0),
        }
    }

    fn surface(issue: Period, lead: u8) -> Surface {
        let lead_time = LeadTime::new(lead).unwrap();
        Surface {
            issue,
            lead_time,
            valid: lead_time.valid_period(issue),
            units: "mm".into(),
            crs: CrsCode::Epsg4326,
            grid: RasterGrid::new(2, 2, 0.0, 2.0, 1.0, 1.0, create_constant_grid(2, 2, 1.0)).unwrap(),
            path: None,
        }
    }

    #[test]
    fn test_descriptions() {
        let period = Some(DatasetPeriod {
            start: p(2024, 1).first_day(),
            end: p(2025, 3).last_day(),
        });
        assert_eq!(
            table_description(&Partition::Admin0All, period),
            "Summarized forecast precipitation anomalies data at adm0 from 2024-01-01 to 2025-03-31"
        );
        assert_eq!(
            table_description(&Partition::Admin1Recent, period),
            "Summarized forecast precipitation anomalies data at adm1 from 2024-01-01 to 2025-03-31"
        );
        assert_eq!(
            table_description(&Partition::Admin1Region("latin_america_and_the_caribbean".into()), period),
            "Summarized forecast precipitation anomalies data at adm1 from 2024-01-01 to 2025-03-31 for Latin America And The Caribbean"
        );
        assert_eq!(
            raster_archive_description(p(2025, 3)),
            "Latest forecast precipitation anomalies raster data from 2025-03"
        );
        assert_eq!(
            raster_archive_name(p(2025, 3)),
            "forecast_precipitation_anomalies_geotiff_2025_03.zip"
        );
    }

    #[test]
    fn test_latest_surfaces_selects_max_issue() {
        let surfaces = vec![
            surface(p(2025, 3), 1),
            surface(p(2025, 2), 0),
            surface(p(2025, 3), 0),
        ];
        let (issue, latest) = latest_surfaces(&surfaces).unwrap();
        assert_eq!(issue, p(2025, 3));
        let leads: Vec<u8> = latest.iter().map(|s| s.lead_time.months()).collect();
        assert_eq!(leads, vec![0, 1]);
        assert!(latest_surfaces(&[]).is_none());
    }

    #[test]
    fn test_build_publication() {
        let history = History::new().merge(Partition::Admin0All, vec![row(p(2024, 12)), row(p(2025, 3))]);
        let surfaces: Vec<Surface> = (0..6)
            .map(|lead| surface(p(2025, 3), lead))
            .chain([surface(p(2025, 2), 0)])
            .collect();

        let publication = build_publication(&history, &surfaces).unwrap();
        let period = publication.time_period.unwrap();
        assert_eq!(period.start, NaiveDate::from_ymd_opt(2024, 12, 1).unwrap());
        assert_eq!(period.end, NaiveDate::from_ymd_opt(2025, 3, 31).unwrap());

        assert_eq!(publication.resources.len(), 2);
        assert!(publication
            .resource("forecast_precipitation_anomalies_adm0.csv")
            .is_some());

        let archive = publication
            .resource("forecast_precipitation_anomalies_geotiff_2025_03.zip")
            .unwrap();
        let mut zip = zip::ZipArchive::new(std::io::Cursor::new(archive.bytes.to_vec())).unwrap();
        assert_eq!(zip.len(), 6);
        let mut first = Vec::new();
        zip.by_index(0).unwrap().read_to_end(&mut first).unwrap();
        assert!(first.starts_with(b"II*\0"));
        assert_eq!(
            zip.by_index(5).unwrap().name(),
            "anomalous_accumulation_2025_03_leadtime5.tif"
        );
    }

    #[test]
    fn test_empty_history_publishes_no_period() {
        let publication = build_publication(&History::new(), &[]).unwrap();
        assert!(publication.time_period.is_none());
        assert!(publication.resources.is_empty());
    }
}
