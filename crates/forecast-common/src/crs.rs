//! Coordinate reference systems of published rasters.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Only geographic WGS84 is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CrsCode {
    Epsg4326,
}

impl CrsCode {
    /// EPSG number written into GeoTIFF geokeys.
    pub fn epsg(&self) -> u16 {
        match self {
            CrsCode::Epsg4326 => 4326,
        }
    }
}

impl fmt::Display for CrsCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg())
    }
}
