//! Grid decoding for seasonal forecast archives.
//!
//! A decoded file is a stack of 2-D fields indexed by issue period and
//! 1-indexed lead-time step, all sharing one latitude/longitude grid in the
//! source's own conventions (0-360 longitudes, north-to-south rows). Any
//! reorientation happens downstream.

pub mod error;
mod grib_file;
pub mod grid;

pub use error::{DecodeError, DecodeResult};
pub use grib_file::GribDecoder;
pub use grid::{DecodedGrid, RATE_UNITS};

use std::path::Path;

/// Decodes a retrieved grid file.
pub trait GridDecoder: Send + Sync {
    fn decode(&self, path: &Path) -> DecodeResult<DecodedGrid>;
}
