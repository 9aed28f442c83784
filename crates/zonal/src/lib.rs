//! Administrative boundary handling and zonal statistics.
//!
//! - [`boundaries`]: admin units at levels 0 and 1, loaded from GeoJSON
//! - [`geometry`]: polygon containment
//! - [`stats`]: per-unit pixel count, mean and median over a raster grid

pub mod boundaries;
pub mod error;
pub mod geometry;
pub mod stats;

pub use boundaries::{AdminBoundaries, AdminLevel, AdminUnit, BoundarySource, GeoJsonBoundaries};
pub use error::{ZonalError, ZonalResult};
pub use geometry::{MultiPolygon, Polygon};
pub use stats::{CellCentreStatistics, ZonalStatistics, ZonalStats};
