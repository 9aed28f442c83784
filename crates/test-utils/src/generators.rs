//! Synthetic grid values and axes.

/// Row-major `width x height` values where cell `(row, col)` holds
/// `col * 1000 + row`, so a value names its source cell after reordering.
pub fn create_test_grid(width: usize, height: usize) -> Vec<f32> {
    (0..height)
        .flat_map(|row| (0..width).map(move |col| (col * 1000 + row) as f32))
        .collect()
}

/// Creates a grid where every cell holds `value`.
pub fn create_constant_grid(width: usize, height: usize, value: f32) -> Vec<f32> {
    vec![value; width * height]
}

/// Axes of a global regular grid in archive layout.
///
/// Latitudes run north to south from 90, longitudes run east from 0 in the
/// 0..360 convention, both at `resolution` degrees.
///
/// # Returns
///
/// `(latitudes, longitudes)`
pub fn global_axes(resolution: f64) -> (Vec<f64>, Vec<f64>) {
    let rows = (180.0 / resolution).round() as usize + 1;
    let cols = (360.0 / resolution).round() as usize;
    let latitudes = (0..rows).map(|i| 90.0 - i as f64 * resolution).collect();
    let longitudes = (0..cols).map(|i| i as f64 * resolution).collect();
    (latitudes, longitudes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_test_grid() {
        let grid = create_test_grid(10, 5);
        assert_eq!(grid.len(), 50);
        assert_eq!(grid[0], 0.0);
        assert_eq!(grid[1], 1000.0);
        assert_eq!(grid[10], 1.0);
        assert_eq!(grid[11], 1001.0);
    }

    #[test]
    fn test_global_axes() {
        let (lats, lons) = global_axes(1.0);
        assert_eq!(lats.len(), 181);
        assert_eq!(lons.len(), 360);
        assert_eq!(lats[0], 90.0);
        assert_eq!(lats[180], -90.0);
        assert_eq!(lons[359], 359.0);
    }
}
