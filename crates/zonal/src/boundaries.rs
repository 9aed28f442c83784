//! Administrative boundary units and their GeoJSON source.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use serde::Deserialize;
use tracing::{info, warn};

use crate::error::{ZonalError, ZonalResult};
use crate::geometry::{MultiPolygon, Polygon};

/// Boundary granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AdminLevel {
    /// Country
    Adm0,
    /// First subnational division
    Adm1,
}

impl AdminLevel {
    pub const ALL: [AdminLevel; 2] = [AdminLevel::Adm0, AdminLevel::Adm1];

    pub fn number(&self) -> u8 {
        match self {
            AdminLevel::Adm0 => 0,
            AdminLevel::Adm1 => 1,
        }
    }

    pub fn from_number(level: u8) -> Option<Self> {
        match level {
            0 => Some(AdminLevel::Adm0),
            1 => Some(AdminLevel::Adm1),
            _ => None,
        }
    }
}

impl fmt::Display for AdminLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// One boundary polygon with its hierarchical code and name chain.
#[derive(Debug, Clone, PartialEq)]
pub struct AdminUnit {
    pub level: AdminLevel,
    pub adm0_pcode: String,
    pub adm0_name: Option<String>,
    pub adm1_pcode: Option<String>,
    pub adm1_name: Option<String>,
    pub geometry: MultiPolygon,
}

/// Supplies admin units per level.
pub trait BoundarySource: Send + Sync {
    fn load(&self, level: AdminLevel) -> ZonalResult<Vec<AdminUnit>>;
}

/// Admin units for both levels, loaded once per run.
#[derive(Debug, Clone, Default)]
pub struct AdminBoundaries {
    adm0: Vec<AdminUnit>,
    adm1: Vec<AdminUnit>,
}

impl AdminBoundaries {
    pub fn new(adm0: Vec<AdminUnit>, adm1: Vec<AdminUnit>) -> Self {
        Self { adm0, adm1 }
    }

    pub fn load(source: &dyn BoundarySource) -> ZonalResult<Self> {
        let adm0 = source.load(AdminLevel::Adm0)?;
        let adm1 = source.load(AdminLevel::Adm1)?;
        info!(adm0 = adm0.len(), adm1 = adm1.len(), "Loaded admin boundaries");
        Ok(Self { adm0, adm1 })
    }

    pub fn units(&self, level: AdminLevel) -> &[AdminUnit] {
        match level {
            AdminLevel::Adm0 => &self.adm0,
            AdminLevel::Adm1 => &self.adm1,
        }
    }
}

/// GeoJSON FeatureCollection files, one per admin level.
#[derive(Debug, Clone)]
pub struct GeoJsonBoundaries {
    pub adm0_path: PathBuf,
    pub adm1_path: PathBuf,
}

impl GeoJsonBoundaries {
    pub fn new(adm0_path: impl Into<PathBuf>, adm1_path: impl Into<PathBuf>) -> Self {
        Self {
            adm0_path: adm0_path.into(),
            adm1_path: adm1_path.into(),
        }
    }
}

impl BoundarySource for GeoJsonBoundaries {
    fn load(&self, level: AdminLevel) -> ZonalResult<Vec<AdminUnit>> {
        let path = match level {
            AdminLevel::Adm0 => &self.adm0_path,
            AdminLevel::Adm1 => &self.adm1_path,
        };
        let json = std::fs::read_to_string(path)?;
        parse_admin_units(&json, level)
    }
}

#[derive(Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(Deserialize)]
struct Feature {
    #[serde(default)]
    properties: HashMap<String, serde_json::Value>,
    geometry: Option<Geometry>,
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum Geometry {
    Polygon { coordinates: Vec<Vec<Vec<f64>>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Vec<f64>>>> },
    #[serde(other)]
    Unsupported,
}

/// Parse a GeoJSON FeatureCollection into admin units of one level.
///
/// Features without geometry are skipped.
pub fn parse_admin_units(json: &str, level: AdminLevel) -> ZonalResult<Vec<AdminUnit>> {
    let collection: FeatureCollection = serde_json::from_str(json)?;
    let mut units = Vec::with_capacity(collection.features.len());

    for (index, feature) in collection.features.into_iter().enumerate() {
        let geometry = match feature.geometry {
            Some(geometry) => to_multipolygon(geometry, index)?,
            None => {
                warn!(index = index, level = %level, "Boundary feature has no geometry, skipping");
                continue;
            }
        };

        let property = |name: &str| property_string(&feature.properties, name);
        let required = |name: &str| {
            property(name).ok_or_else(|| ZonalError::MissingProperty {
                index,
                property: name.to_string(),
            })
        };

        let adm1_pcode = match level {
            AdminLevel::Adm0 => None,
            AdminLevel::Adm1 => Some(required("adm1_pcode")?),
        };
        let adm1_name = match level {
            AdminLevel::Adm0 => None,
            AdminLevel::Adm1 => property("adm1_name"),
        };

        units.push(AdminUnit {
            level,
            adm0_pcode: required("adm0_pcode")?,
            adm0_name: property("adm0_name"),
            adm1_pcode,
            adm1_name,
            geometry,
        });
    }

    Ok(units)
}

fn property_string(properties: &HashMap<String, serde_json::Value>, name: &str) -> Option<String> {
    match properties.get(name)? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn to_multipolygon(geometry: Geometry, index: usize) -> ZonalResult<MultiPolygon> {
    let polygons = match geometry {
        Geometry::Polygon { coordinates } => vec![to_polygon(coordinates, index)?],
        Geometry::MultiPolygon { coordinates } => coordinates
            .into_iter()
            .map(|rings| to_polygon(rings, index))
            .collect::<ZonalResult<Vec<_>>>()?,
        Geometry::Unsupported => {
            return Err(ZonalError::InvalidGeometry {
                index,
                reason: "only Polygon and MultiPolygon are supported".into(),
            })
        }
    };
    Ok(MultiPolygon::new(polygons))
}

fn to_polygon(rings: Vec<Vec<Vec<f64>>>, index: usize) -> ZonalResult<Polygon> {
    let mut rings = rings
        .into_iter()
        .map(|ring| to_ring(ring, index))
        .collect::<ZonalResult<Vec<_>>>()?
        .into_iter();

    let exterior = rings.next().ok_or_else(|| ZonalError::InvalidGeometry {
        index,
        reason: "polygon has no rings".into(),
    })?;

    Ok(Polygon {
        exterior,
        holes: rings.collect(),
    })
}

fn to_ring(positions: Vec<Vec<f64>>, index: usize) -> ZonalResult<Vec<(f64, f64)>> {
    positions
        .into_iter()
        .map(|position| match position.as_slice() {
            [x, y, ..] => Ok((*x, *y)),
            _ => Err(ZonalError::InvalidGeometry {
                index,
                reason: "position with fewer than two coordinates".into(),
            }),
        })
        .collect()
}
