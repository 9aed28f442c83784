//! Polygon geometry for boundary containment tests.

use forecast_common::BoundingBox;

/// A polygon with an exterior ring and optional holes, in (lon, lat).
///
/// Rings may be open or closed; the closing edge is implied.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    pub exterior: Vec<(f64, f64)>,
    pub holes: Vec<Vec<(f64, f64)>>,
}

impl Polygon {
    pub fn new(exterior: Vec<(f64, f64)>) -> Self {
        Self {
            exterior,
            holes: Vec::new(),
        }
    }

    pub fn with_hole(mut self, hole: Vec<(f64, f64)>) -> Self {
        self.holes.push(hole);
        self
    }

    /// Even-odd containment; points inside a hole are outside.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        ring_contains(&self.exterior, x, y) && !self.holes.iter().any(|h| ring_contains(h, x, y))
    }
}

/// A set of polygons making up one admin unit.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MultiPolygon {
    pub polygons: Vec<Polygon>,
}

impl MultiPolygon {
    pub fn new(polygons: Vec<Polygon>) -> Self {
        Self { polygons }
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        self.polygons.iter().any(|p| p.contains(x, y))
    }

    pub fn bbox(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(
            self.polygons
                .iter()
                .flat_map(|p| p.exterior.iter().copied()),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.iter().all(|p| p.exterior.len() < 3)
    }
}

fn ring_contains(ring: &[(f64, f64)], x: f64, y: f64) -> bool {
    if ring.len() < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let (xi, yi) = ring[i];
        let (xj, yj) = ring[j];
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(min: f64, max: f64) -> Vec<(f64, f64)> {
        vec![(min, min), (max, min), (max, max), (min, max), (min, min)]
    }

    #[test]
    fn test_square_contains() {
        let polygon = Polygon::new(square(0.0, 10.0));
        assert!(polygon.contains(5.0, 5.0));
        assert!(!polygon.contains(15.0, 5.0));
        assert!(!polygon.contains(-0.1, 5.0));
    }

    #[test]
    fn test_hole_excludes_points() {
        let polygon = Polygon::new(square(0.0, 10.0)).with_hole(square(4.0, 6.0));
        assert!(polygon.contains(2.0, 2.0));
        assert!(!polygon.contains(5.0, 5.0));
    }

    #[test]
    fn test_open_ring_and_multipolygon() {
        let open = vec![(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0)];
        let multi = MultiPolygon::new(vec![
            Polygon::new(open),
            Polygon::new(square(10.0, 12.0)),
        ]);
        assert!(multi.contains(1.0, 1.0));
        assert!(multi.contains(11.0, 11.0));
        assert!(!multi.contains(5.0, 5.0));
        assert_eq!(multi.bbox(), Some(BoundingBox::new(0.0, 0.0, 12.0, 12.0)));
    }

    #[test]
    fn test_degenerate_ring() {
        let polygon = Polygon::new(vec![(0.0, 0.0), (1.0, 1.0)]);
        assert!(!polygon.contains(0.5, 0.5));
        assert!(MultiPolygon::new(vec![polygon]).is_empty());
    }
}
