//! GRIB2 decoding via the `grib` crate.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use grib::codetables::grib2::Table4_4;
use grib::{Code, ForecastTime};
use tracing::{debug, info};

use forecast_common::Period;

use crate::error::{DecodeError, DecodeResult};
use crate::grid::DecodedGrid;
use crate::GridDecoder;

/// Decoder for ensemble-mean seasonal GRIB2 files.
///
/// Each message's lead step is its forecast month: the month its forecast
/// period starts in, counted from the reference month (1 = issue month).
#[derive(Debug, Clone, Copy, Default)]
pub struct GribDecoder;

impl GribDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl GridDecoder for GribDecoder {
    fn decode(&self, path: &Path) -> DecodeResult<DecodedGrid> {
        let file = File::open(path)?;
        let grib_file = ::grib::from_reader(BufReader::new(file))
            .map_err(|e| DecodeError::Malformed(format!("{}: {}", path.display(), e)))?;

        let mut grid: Option<DecodedGrid> = None;

        for (index, submessage) in grib_file.iter() {
            let ref_time = submessage.identification().ref_time_unchecked();
            let reference = NaiveDate::from_ymd_opt(
                ref_time.year as i32,
                ref_time.month as u32,
                ref_time.day as u32,
            )
            .and_then(|date| {
                date.and_hms_opt(ref_time.hour as u32, ref_time.minute as u32, ref_time.second as u32)
            })
            .ok_or_else(|| DecodeError::Malformed(format!("message {:?}: reference time {}", index, ref_time)))?;
            let issue = Period::from_date(reference.date());

            let offset = submessage
                .prod_def()
                .forecast_time()
                .as_ref()
                .and_then(forecast_offset)
                .ok_or_else(|| {
                    DecodeError::Malformed(format!("message {:?}: no usable forecast time", index))
                })?;
            let step = lead_step(reference, offset)?;

            if grid.is_none() {
                let points: Vec<(f64, f64)> = submessage
                    .latlons()
                    .map_err(|e| DecodeError::Malformed(e.to_string()))?
                    .map(|(lat, lon)| (lat as f64, lon as f64))
                    .collect();
                let (latitudes, longitudes) = axes_from_points(&points)?;
                debug!(
                    width = longitudes.len(),
                    height = latitudes.len(),
                    "Decoded grid axes"
                );
                grid = Some(DecodedGrid::new(latitudes, longitudes));
            }

            let values: Vec<f32> = ::grib::Grib2SubmessageDecoder::from(submessage)
                .map_err(|e| DecodeError::Malformed(format!("message {:?}: {}", index, e)))?
                .dispatch()
                .map_err(|e| DecodeError::Malformed(format!("message {:?}: {}", index, e)))?
                .collect();

            if let Some(grid) = grid.as_mut() {
                grid.insert(issue, step, values)?;
            }
        }

        let grid = grid.ok_or_else(|| DecodeError::Empty(path.display().to_string()))?;
        info!(
            path = %path.display(),
            fields = grid.len(),
            issues = grid.issue_periods().len(),
            "Decoded GRIB file"
        );
        Ok(grid)
    }
}

/// Forecast time of a message, relative to its reference time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ForecastOffset {
    Elapsed(Duration),
    Months(u32),
}

fn forecast_offset(time: &ForecastTime) -> Option<ForecastOffset> {
    let value = i64::from(time.value);
    let elapsed = match &time.unit {
        Code::Name(Table4_4::Second) => Duration::seconds(value),
        Code::Name(Table4_4::Minute) => Duration::minutes(value),
        Code::Name(Table4_4::Hour) => Duration::hours(value),
        Code::Name(Table4_4::ThreeHours) => Duration::hours(3 * value),
        Code::Name(Table4_4::SixHours) => Duration::hours(6 * value),
        Code::Name(Table4_4::TwelveHours) => Duration::hours(12 * value),
        Code::Name(Table4_4::Day) => Duration::days(value),
        Code::Name(Table4_4::Month) => return Some(ForecastOffset::Months(time.value)),
        _ => return None,
    };
    Some(ForecastOffset::Elapsed(elapsed))
}

/// 1-indexed forecast month of a field issued at `reference`.
fn lead_step(reference: NaiveDateTime, offset: ForecastOffset) -> DecodeResult<u8> {
    let issue = Period::from_date(reference.date());
    let start = match offset {
        ForecastOffset::Elapsed(elapsed) => Period::from_date((reference + elapsed).date()),
        ForecastOffset::Months(months) => issue.add_months(months.min(i32::MAX as u32) as i32),
    };
    let step = start.months_since(issue) + 1;
    u8::try_from(step)
        .ok()
        .filter(|step| (1..=6).contains(step))
        .ok_or_else(|| {
            DecodeError::Malformed(format!(
                "forecast starting {} is not within six months of issue {}",
                start, issue
            ))
        })
}

/// Recover the latitude and longitude axes of a regular grid from its
/// points in scan order (rows of constant latitude).
fn axes_from_points(points: &[(f64, f64)]) -> DecodeResult<(Vec<f64>, Vec<f64>)> {
    let first_lat = match points.first() {
        Some((lat, _)) => *lat,
        None => return Err(DecodeError::IrregularGrid("grid has no points".into())),
    };

    let longitudes: Vec<f64> = points
        .iter()
        .take_while(|(lat, _)| *lat == first_lat)
        .map(|(_, lon)| *lon)
        .collect();
    let width = longitudes.len();

    if points.len() % width != 0 {
        return Err(DecodeError::IrregularGrid(format!(
            "{} points do not form rows of {}",
            points.len(),
            width
        )));
    }

    let latitudes: Vec<f64> = points.chunks(width).map(|row| row[0].0).collect();
    Ok((latitudes, longitudes))
}
