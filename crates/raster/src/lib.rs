//! Raster surfaces for seasonal forecast fields.
//!
//! A [`Surface`] is one decoded field for a single (issue period, lead time)
//! pair, oriented north-up with ascending longitudes. Surfaces are encoded as
//! single-band float32 GeoTIFFs and bundled into zip archives for publishing.

pub mod archive;
pub mod error;
pub mod geotiff;
pub mod surface;

pub use archive::bundle_rasters;
pub use error::{RasterError, RasterResult};
pub use geotiff::{encode_geotiff, write_geotiff};
pub use surface::{RasterGrid, Surface};
