//! Decodes registered grid files into north-up accumulation surfaces.

use std::collections::BTreeSet;
use std::path::Path;

use tracing::{debug, info};

use forecast_common::{CrsCode, LeadTime, Period};
use grid_decoder::{DecodedGrid, GridDecoder};
use raster::{write_geotiff, RasterGrid, Surface};

use crate::error::{MaterializeError, Result};
use crate::planner::RegisteredFile;

pub const SECONDS_PER_DAY: f64 = 86_400.0;
pub const MILLIMETRES_PER_METRE: f64 = 1000.0;
pub const ACCUMULATION_UNITS: &str = "mm";

/// Factor turning a rate in m/s into a monthly total in mm for `valid`.
pub fn accumulation_factor(valid: Period) -> f64 {
    valid.days_in_month() as f64 * SECONDS_PER_DAY * MILLIMETRES_PER_METRE
}

/// Map a longitude onto [-180, 180).
pub fn normalize_longitude(lon: f64) -> f64 {
    (lon + 180.0).rem_euclid(360.0) - 180.0
}

/// Reorientation from the decoded axes to a north-up, west-to-east grid.
#[derive(Debug, Clone, PartialEq)]
struct GridLayout {
    /// Source column for each output column
    columns: Vec<usize>,
    /// Source row for each output row
    rows: Vec<usize>,
    west: f64,
    north: f64,
    cell_width: f64,
    cell_height: f64,
}

impl GridLayout {
    fn from_axes(latitudes: &[f64], longitudes: &[f64]) -> std::result::Result<Self, MaterializeError> {
        let mut columns: Vec<(f64, usize)> = longitudes
            .iter()
            .enumerate()
            .map(|(i, lon)| (normalize_longitude(*lon), i))
            .collect();
        columns.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut rows: Vec<(f64, usize)> = latitudes.iter().copied().zip(0..).collect();
        rows.sort_by(|a, b| b.0.total_cmp(&a.0));

        let lons: Vec<f64> = columns.iter().map(|(lon, _)| *lon).collect();
        let lats: Vec<f64> = rows.iter().map(|(lat, _)| *lat).collect();
        let cell_width = regular_spacing(&lons, "longitude")?;
        let cell_height = regular_spacing(&lats, "latitude")?;

        Ok(Self {
            west: lons[0] - cell_width / 2.0,
            north: lats[0] + cell_height / 2.0,
            columns: columns.into_iter().map(|(_, i)| i).collect(),
            rows: rows.into_iter().map(|(_, i)| i).collect(),
            cell_width,
            cell_height,
        })
    }

    fn reorder(&self, values: &[f32], factor: f64) -> Vec<f32> {
        let width = self.columns.len();
        let mut out = Vec::with_capacity(width * self.rows.len());
        for &row in &self.rows {
            for &col in &self.columns {
                out.push((values[row * width + col] as f64 * factor) as f32);
            }
        }
        out
    }
}

/// Spacing of a sorted axis; the axis must be evenly spaced.
fn regular_spacing(axis: &[f64], name: &str) -> std::result::Result<f64, MaterializeError> {
    if axis.len() < 2 {
        return Err(MaterializeError::Layout(format!(
            "{} axis has {} points",
            name,
            axis.len()
        )));
    }

    let step = (axis[axis.len() - 1] - axis[0]).abs() / (axis.len() - 1) as f64;
    let tolerance = step * 1e-3;
    let regular = axis
        .windows(2)
        .all(|pair| ((pair[1] - pair[0]).abs() - step).abs() <= tolerance);

    if step <= 0.0 || !regular {
        return Err(MaterializeError::Layout(format!("{} axis is not evenly spaced", name)));
    }
    Ok(step)
}

/// One surface per (issue period, lead time) pair whose issue period is in
/// `issues`, converted to monthly accumulation and reoriented north-up.
pub fn surfaces_from_grid(
    grid: &DecodedGrid,
    issues: &BTreeSet<Period>,
) -> std::result::Result<Vec<Surface>, MaterializeError> {
    let layout = GridLayout::from_axes(&grid.latitudes, &grid.longitudes)?;

    let mut surfaces = Vec::new();
    for (issue, step, values) in grid.fields() {
        if !issues.contains(&issue) {
            debug!(issue = %issue, step = step, "Skipping field for unrequested issue period");
            continue;
        }

        let lead_time = LeadTime::from_step(step)?;
        let valid = lead_time.valid_period(issue);
        let raster = RasterGrid::new(
            layout.columns.len(),
            layout.rows.len(),
            layout.west,
            layout.north,
            layout.cell_width,
            layout.cell_height,
            layout.reorder(values, accumulation_factor(valid)),
        )?;

        surfaces.push(Surface {
            issue,
            lead_time,
            valid,
            units: ACCUMULATION_UNITS.to_string(),
            crs: CrsCode::Epsg4326,
            grid: raster,
            path: None,
        });
    }
    Ok(surfaces)
}

/// Produces surfaces for registered files and writes them to scratch.
pub struct Materializer<'a> {
    decoder: &'a dyn GridDecoder,
    scratch_dir: &'a Path,
}

impl<'a> Materializer<'a> {
    pub fn new(decoder: &'a dyn GridDecoder, scratch_dir: &'a Path) -> Self {
        Self {
            decoder,
            scratch_dir,
        }
    }

    /// Decode a registered file, keeping only the issue periods its request asked for.
    pub fn materialize(
        &self,
        file: &RegisteredFile,
    ) -> std::result::Result<Vec<Surface>, MaterializeError> {
        let grid = self.decoder.decode(&file.path)?;
        let surfaces = surfaces_from_grid(&grid, &file.request.periods())?;
        info!(
            path = %file.path.display(),
            surfaces = surfaces.len(),
            "Materialized surfaces"
        );
        Ok(surfaces)
    }

    /// Write a surface's GeoTIFF rendition to scratch and record its path.
    pub fn write(&self, surface: &mut Surface) -> Result<()> {
        let path = self.scratch_dir.join(surface.file_name());
        write_geotiff(&path, &surface.grid, surface.crs)?;
        debug!(path = %path.display(), "Wrote surface raster");
        surface.path = Some(path);
        Ok(())
    }
}
