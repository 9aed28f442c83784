//! Surface and raster grid types.

use std::ops::Range;
use std::path::PathBuf;

use forecast_common::{BoundingBox, CrsCode, LeadTime, Period};

use crate::error::{RasterError, RasterResult};

/// A regular, north-up grid of float32 cells.
///
/// Row 0 is the northernmost row and column 0 the westernmost column.
/// `west`/`north` are the outer edges of the grid, not cell centres.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterGrid {
    pub width: usize,
    pub height: usize,
    pub west: f64,
    pub north: f64,
    pub cell_width: f64,
    pub cell_height: f64,
    pub values: Vec<f32>,
}

impl RasterGrid {
    pub fn new(
        width: usize,
        height: usize,
        west: f64,
        north: f64,
        cell_width: f64,
        cell_height: f64,
        values: Vec<f32>,
    ) -> RasterResult<Self> {
        if width == 0 || height == 0 {
            return Err(RasterError::InvalidGrid("empty grid".into()));
        }
        if values.len() != width * height {
            return Err(RasterError::InvalidGrid(format!(
                "{} values for a {}x{} grid",
                values.len(),
                width,
                height
            )));
        }
        if cell_width <= 0.0 || cell_height <= 0.0 {
            return Err(RasterError::InvalidGrid(format!(
                "non-positive cell size {}x{}",
                cell_width, cell_height
            )));
        }

        Ok(Self {
            width,
            height,
            west,
            north,
            cell_width,
            cell_height,
            values,
        })
    }

    pub fn value(&self, row: usize, col: usize) -> f32 {
        self.values[row * self.width + col]
    }

    /// (lon, lat) of a cell centre.
    pub fn cell_centre(&self, row: usize, col: usize) -> (f64, f64) {
        (
            self.west + (col as f64 + 0.5) * self.cell_width,
            self.north - (row as f64 + 0.5) * self.cell_height,
        )
    }

    pub fn bbox(&self) -> BoundingBox {
        BoundingBox::new(
            self.west,
            self.north - self.height as f64 * self.cell_height,
            self.west + self.width as f64 * self.cell_width,
            self.north,
        )
    }

    /// Columns whose centre longitude lies within `[min_lon, max_lon]`.
    pub fn columns_within(&self, min_lon: f64, max_lon: f64) -> Range<usize> {
        let first = ((min_lon - self.west) / self.cell_width - 0.5).ceil();
        let last = ((max_lon - self.west) / self.cell_width - 0.5).floor();
        clamp_span(first, last, self.width)
    }

    /// Rows whose centre latitude lies within `[min_lat, max_lat]`.
    pub fn rows_within(&self, min_lat: f64, max_lat: f64) -> Range<usize> {
        let first = ((self.north - max_lat) / self.cell_height - 0.5).ceil();
        let last = ((self.north - min_lat) / self.cell_height - 0.5).floor();
        clamp_span(first, last, self.height)
    }
}

fn clamp_span(first: f64, last: f64, len: usize) -> Range<usize> {
    if last < 0.0 || first > (len as f64 - 1.0) || last < first {
        return 0..0;
    }
    let start = first.max(0.0) as usize;
    let end = (last as usize).min(len - 1) + 1;
    start..end
}

/// One materialized forecast field for an (issue period, lead time) pair.
#[derive(Debug, Clone)]
pub struct Surface {
    pub issue: Period,
    pub lead_time: LeadTime,
    pub valid: Period,
    pub units: String,
    pub crs: CrsCode,
    pub grid: RasterGrid,
    /// Where the GeoTIFF rendition was written, once it has been.
    pub path: Option<PathBuf>,
}

impl Surface {
    /// Scratch file name, e.g. `anomalous_accumulation_2025_03_leadtime0.tif`.
    pub fn file_name(&self) -> String {
        format!(
            "anomalous_accumulation_{:04}_{:02}_leadtime{}.tif",
            self.issue.year(),
            self.issue.month(),
            self.lead_time.months()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_4x2() -> RasterGrid {
        // 4 columns from -180 with 90 degree cells, 2 rows from 90 with 90 degree cells
        RasterGrid::new(4, 2, -180.0, 90.0, 90.0, 90.0, (0..8).map(|v| v as f32).collect())
            .unwrap()
    }

    #[test]
    fn test_rejects_bad_dimensions() {
        assert!(RasterGrid::new(2, 2, 0.0, 0.0, 1.0, 1.0, vec![0.0; 3]).is_err());
        assert!(RasterGrid::new(0, 2, 0.0, 0.0, 1.0, 1.0, vec![]).is_err());
        assert!(RasterGrid::new(1, 1, 0.0, 0.0, 0.0, 1.0, vec![0.0]).is_err());
    }

    #[test]
    fn test_cell_centres() {
        let grid = grid_4x2();
        assert_eq!(grid.cell_centre(0, 0), (-135.0, 45.0));
        assert_eq!(grid.cell_centre(1, 3), (135.0, -45.0));
        assert_eq!(grid.value(1, 3), 7.0);
        assert_eq!(grid.bbox(), BoundingBox::new(-180.0, -90.0, 180.0, 90.0));
    }

    #[test]
    fn test_columns_and_rows_within() {
        let grid = grid_4x2();
        assert_eq!(grid.columns_within(-140.0, -40.0), 0..2);
        assert_eq!(grid.columns_within(-130.0, -50.0), 0..0);
        assert_eq!(grid.columns_within(-500.0, 500.0), 0..4);
        assert_eq!(grid.rows_within(0.0, 90.0), 0..1);
        assert_eq!(grid.rows_within(-90.0, 90.0), 0..2);
        assert_eq!(grid.rows_within(100.0, 120.0), 0..0);
    }

    #[test]
    fn test_surface_file_name() {
        let surface = Surface {
            issue: Period::new(2025, 3).unwrap(),
            lead_time: LeadTime::new(0).unwrap(),
            valid: Period::new(2025, 3).unwrap(),
            units: "mm".into(),
            crs: CrsCode::Epsg4326,
            grid: grid_4x2(),
            path: None,
        };
        assert_eq!(
            surface.file_name(),
            "anomalous_accumulation_2025_03_leadtime0.tif"
        );
    }
}
