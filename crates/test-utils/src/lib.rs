//! Helpers shared by the workspace's tests: float assertions, synthetic
//! grids, GeoJSON and country fixtures, and lookup of large archive files
//! kept outside the repository.

pub mod fixtures;
pub mod generators;
pub mod paths;

pub use fixtures::*;
pub use generators::*;
pub use paths::*;

/// Resolve a test file via [`find_test_file`] or return early from the test.
///
/// ```ignore
/// let path = require_test_file!("seasonal_precip_anomaly.grib");
/// ```
#[macro_export]
macro_rules! require_test_file {
    ($name:expr) => {{
        let name = $name;
        let Some(path) = $crate::find_test_file(name) else {
            eprintln!("skipping: {} not found (set {})", name, $crate::TEST_DATA_VAR);
            return;
        };
        path
    }};
}

/// Assert `|left - right| <= epsilon`, comparing as f64.
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let (l, r, eps) = ($left as f64, $right as f64, $epsilon as f64);
        assert!(
            (l - r).abs() <= eps,
            "assertion failed: {} is not within {} of {} (off by {})",
            l,
            eps,
            r,
            (l - r).abs()
        );
    }};
}

/// [`assert_approx_eq!`] over two `Option`s; `None` only matches `None`.
#[macro_export]
macro_rules! assert_option_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        match ($left, $right) {
            (Some(l), Some(r)) => $crate::assert_approx_eq!(l, r, $epsilon),
            (None, None) => {}
            (l, r) => panic!("assertion failed: {:?} does not match {:?}", l, r),
        }
    }};
}
