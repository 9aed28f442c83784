//! Boundary and country reference fixtures.

use std::path::{Path, PathBuf};

use serde_json::{json, Map, Value};

/// A small country reference table in the `iso3,iso2,name,region` layout.
///
/// `Yemen` sits in a region with a single member so region partition tests
/// can check a one-country partition.
pub const COUNTRY_TABLE_CSV: &str = "\
iso3,iso2,name,region
AFG,AF,Afghanistan,Asia
PAK,PK,Pakistan,Asia
KEN,KE,Kenya,Africa
SOM,SO,Somalia,Africa
COL,CO,Colombia,Latin America and the Caribbean
YEM,YE,Yemen,Middle East
";

/// Closed ring for an axis-aligned rectangle.
pub fn rectangle_ring(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Vec<(f64, f64)> {
    vec![
        (min_x, min_y),
        (max_x, min_y),
        (max_x, max_y),
        (min_x, max_y),
        (min_x, min_y),
    ]
}

/// GeoJSON Feature with a rectangular Polygon geometry and string properties.
pub fn rectangle_feature(properties: &[(&str, &str)], bbox: (f64, f64, f64, f64)) -> String {
    let props: Map<String, Value> = properties
        .iter()
        .map(|(key, value)| (key.to_string(), Value::from(*value)))
        .collect();
    let (min_x, min_y, max_x, max_y) = bbox;
    let ring: Vec<[f64; 2]> = rectangle_ring(min_x, min_y, max_x, max_y)
        .into_iter()
        .map(|(x, y)| [x, y])
        .collect();

    json!({
        "type": "Feature",
        "properties": props,
        "geometry": { "type": "Polygon", "coordinates": [ring] },
    })
    .to_string()
}

/// Wrap features in a GeoJSON FeatureCollection.
pub fn feature_collection(features: &[String]) -> String {
    let features: Vec<Value> = features
        .iter()
        .map(|f| serde_json::from_str(f).expect("fixture feature is not JSON"))
        .collect();
    json!({ "type": "FeatureCollection", "features": features }).to_string()
}

/// Write `contents` to `dir/name` and return the path.
pub fn write_fixture(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("Failed to write fixture file");
    path
}
