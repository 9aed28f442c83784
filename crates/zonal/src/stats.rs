//! Per-unit summary statistics over a raster grid.

use raster::RasterGrid;
use tracing::debug;

use crate::boundaries::AdminUnit;

/// Pixel count, mean and median of the cells falling inside one unit.
///
/// `mean`/`median` are `None` when no valid cell falls inside.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZonalStats {
    pub pixel_count: f64,
    pub mean: Option<f64>,
    pub median: Option<f64>,
}

impl ZonalStats {
    pub const EMPTY: ZonalStats = ZonalStats {
        pixel_count: 0.0,
        mean: None,
        median: None,
    };

    /// Summarize a set of cell values; NaN cells are ignored.
    pub fn from_values(values: &mut [f64]) -> Self {
        let len = partition_valid(values);
        let valid = &mut values[..len];
        if valid.is_empty() {
            return Self::EMPTY;
        }

        let mean = valid.iter().sum::<f64>() / valid.len() as f64;

        valid.sort_by(|a, b| a.total_cmp(b));
        let mid = valid.len() / 2;
        let median = if valid.len() % 2 == 0 {
            (valid[mid - 1] + valid[mid]) / 2.0
        } else {
            valid[mid]
        };

        Self {
            pixel_count: valid.len() as f64,
            mean: Some(mean),
            median: Some(median),
        }
    }
}

/// Move non-NaN values to the front, returning how many there are.
fn partition_valid(values: &mut [f64]) -> usize {
    let mut len = 0;
    for i in 0..values.len() {
        if !values[i].is_nan() {
            values.swap(len, i);
            len += 1;
        }
    }
    len
}

/// Computes statistics for every unit over a grid, in unit order.
pub trait ZonalStatistics: Send + Sync {
    fn compute(&self, grid: &RasterGrid, units: &[AdminUnit]) -> Vec<ZonalStats>;
}

/// A cell belongs to a unit when its centre falls inside the unit's geometry.
#[derive(Debug, Clone, Copy, Default)]
pub struct CellCentreStatistics;

impl CellCentreStatistics {
    pub fn new() -> Self {
        Self
    }

    pub fn unit_stats(&self, grid: &RasterGrid, unit: &AdminUnit) -> ZonalStats {
        let Some(bbox) = unit.geometry.bbox() else {
            return ZonalStats::EMPTY;
        };

        let mut values = Vec::new();
        for row in grid.rows_within(bbox.min_y, bbox.max_y) {
            for col in grid.columns_within(bbox.min_x, bbox.max_x) {
                let (lon, lat) = grid.cell_centre(row, col);
                if unit.geometry.contains(lon, lat) {
                    values.push(grid.value(row, col) as f64);
                }
            }
        }

        ZonalStats::from_values(&mut values)
    }
}

impl ZonalStatistics for CellCentreStatistics {
    fn compute(&self, grid: &RasterGrid, units: &[AdminUnit]) -> Vec<ZonalStats> {
        let stats: Vec<ZonalStats> = units.iter().map(|unit| self.unit_stats(grid, unit)).collect();
        debug!(
            units = units.len(),
            empty = stats.iter().filter(|s| s.mean.is_none()).count(),
            "Computed zonal statistics"
        );
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundaries::AdminLevel;
    use crate::geometry::{MultiPolygon, Polygon};
    use test_utils::{assert_approx_eq, assert_option_approx_eq};

    fn square(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Polygon {
        Polygon::new(vec![
            (min_x, min_y),
            (max_x, min_y),
            (max_x, max_y),
            (min_x, max_y),
            (min_x, min_y),
        ])
    }

    fn unit(polygon: Polygon) -> AdminUnit {
        AdminUnit {
            level: AdminLevel::Adm0,
            adm0_pcode: "XX".into(),
            adm0_name: None,
            adm1_pcode: None,
            adm1_name: None,
            geometry: MultiPolygon::new(vec![polygon]),
        }
    }

    /// 4x4 one-degree grid covering lon 0..4, lat 0..4 with values 0..16 row-major.
    fn grid() -> RasterGrid {
        RasterGrid::new(4, 4, 0.0, 4.0, 1.0, 1.0, (0..16).map(|v| v as f32).collect()).unwrap()
    }

    #[test]
    fn test_from_values_odd_and_even() {
        let odd = ZonalStats::from_values(&mut [3.0, 1.0, 2.0]);
        assert_eq!(odd.pixel_count, 3.0);
        assert_approx_eq!(odd.mean.unwrap(), 2.0, 1e-12);
        assert_eq!(odd.median, Some(2.0));

        let even = ZonalStats::from_values(&mut [4.0, 1.0, 3.0, 2.0]);
        assert_eq!(even.median, Some(2.5));
    }

    #[test]
    fn test_from_values_ignores_nan() {
        let stats = ZonalStats::from_values(&mut [f64::NAN, 1.0, f64::NAN, 5.0]);
        assert_eq!(stats.pixel_count, 2.0);
        assert_eq!(stats.mean, Some(3.0));
        assert_eq!(stats.median, Some(3.0));

        assert_eq!(ZonalStats::from_values(&mut [f64::NAN]), ZonalStats::EMPTY);
        assert_eq!(ZonalStats::from_values(&mut []), ZonalStats::EMPTY);
    }

    #[test]
    fn test_cell_centre_membership() {
        // Covers centres (0.5, 3.5), (1.5, 3.5), (0.5, 2.5), (1.5, 2.5): values 0, 1, 4, 5
        let stats = CellCentreStatistics::new().unit_stats(&grid(), &unit(square(0.0, 2.0, 2.0, 4.0)));
        assert_eq!(stats.pixel_count, 4.0);
        assert_option_approx_eq!(stats.mean, Some(2.5), 1e-12);
        assert_option_approx_eq!(stats.median, Some(2.5), 1e-12);
    }

    #[test]
    fn test_hole_excludes_cells() {
        let polygon = square(0.0, 0.0, 4.0, 4.0).with_hole(vec![
            (1.0, 1.0),
            (3.0, 1.0),
            (3.0, 3.0),
            (1.0, 3.0),
            (1.0, 1.0),
        ]);
        let stats = CellCentreStatistics::new().unit_stats(&grid(), &unit(polygon));
        assert_eq!(stats.pixel_count, 12.0);
    }

    #[test]
    fn test_unit_outside_grid_is_empty() {
        let units = vec![
            unit(square(10.0, 10.0, 12.0, 12.0)),
            // Too small to contain any cell centre
            unit(square(0.1, 0.1, 0.2, 0.2)),
        ];
        let stats = CellCentreStatistics::new().compute(&grid(), &units);
        assert_eq!(stats, vec![ZonalStats::EMPTY, ZonalStats::EMPTY]);
    }

    #[test]
    fn test_nan_cells_not_counted() {
        let mut values: Vec<f32> = (0..16).map(|v| v as f32).collect();
        values[0] = f32::NAN;
        let grid = RasterGrid::new(4, 4, 0.0, 4.0, 1.0, 1.0, values).unwrap();

        let stats = CellCentreStatistics::new().unit_stats(&grid, &unit(square(0.0, 2.0, 2.0, 4.0)));
        assert_eq!(stats.pixel_count, 3.0);
        assert_eq!(stats.median, Some(4.0));
    }
}
