//! Single-band float32 GeoTIFF encoding.
//!
//! Writes a little-endian baseline TIFF with one deflate-compressed strip
//! and the GeoTIFF tags needed to georeference a geographic grid:
//! pixel scale, one tie point at the north-west corner, and a geokey
//! directory naming the EPSG code. Missing cells are NaN and flagged via
//! the GDAL nodata tag.

use std::io::Write;
use std::path::Path;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use tracing::debug;

use forecast_common::CrsCode;

use crate::error::RasterResult;
use crate::surface::RasterGrid;

// TIFF field types
const TYPE_ASCII: u16 = 2;
const TYPE_SHORT: u16 = 3;
const TYPE_LONG: u16 = 4;
const TYPE_DOUBLE: u16 = 12;

// Baseline tags
const TAG_IMAGE_WIDTH: u16 = 256;
const TAG_IMAGE_LENGTH: u16 = 257;
const TAG_BITS_PER_SAMPLE: u16 = 258;
const TAG_COMPRESSION: u16 = 259;
const TAG_PHOTOMETRIC: u16 = 262;
const TAG_STRIP_OFFSETS: u16 = 273;
const TAG_SAMPLES_PER_PIXEL: u16 = 277;
const TAG_ROWS_PER_STRIP: u16 = 278;
const TAG_STRIP_BYTE_COUNTS: u16 = 279;
const TAG_PLANAR_CONFIG: u16 = 284;
const TAG_SAMPLE_FORMAT: u16 = 339;

// GeoTIFF tags
const TAG_MODEL_PIXEL_SCALE: u16 = 33550;
const TAG_MODEL_TIEPOINT: u16 = 33922;
const TAG_GEO_KEY_DIRECTORY: u16 = 34735;
const TAG_GDAL_NODATA: u16 = 42113;

const COMPRESSION_DEFLATE: u16 = 8;
const SAMPLE_FORMAT_FLOAT: u16 = 3;

// GeoKeys
const GT_MODEL_TYPE: u16 = 1024;
const GT_RASTER_TYPE: u16 = 1025;
const GEOGRAPHIC_TYPE: u16 = 2048;
const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
const RASTER_PIXEL_IS_AREA: u16 = 1;

const HEADER_LEN: usize = 8;
const IFD_ENTRY_LEN: usize = 12;

struct IfdEntry {
    tag: u16,
    field_type: u16,
    count: u32,
    /// Little-endian value bytes
    data: Vec<u8>,
}

impl IfdEntry {
    fn short(tag: u16, value: u16) -> Self {
        Self::shorts(tag, &[value])
    }

    fn shorts(tag: u16, values: &[u16]) -> Self {
        Self {
            tag,
            field_type: TYPE_SHORT,
            count: values.len() as u32,
            data: values.iter().flat_map(|v| v.to_le_bytes()).collect(),
        }
    }

    fn long(tag: u16, value: u32) -> Self {
        Self {
            tag,
            field_type: TYPE_LONG,
            count: 1,
            data: value.to_le_bytes().to_vec(),
        }
    }

    fn doubles(tag: u16, values: &[f64]) -> Self {
        Self {
            tag,
            field_type: TYPE_DOUBLE,
            count: values.len() as u32,
            data: values.iter().flat_map(|v| v.to_le_bytes()).collect(),
        }
    }

    fn ascii(tag: u16, value: &str) -> Self {
        let mut data = value.as_bytes().to_vec();
        data.push(0);
        Self {
            tag,
            field_type: TYPE_ASCII,
            count: data.len() as u32,
            data,
        }
    }
}

/// Encode a grid as a GeoTIFF.
pub fn encode_geotiff(grid: &RasterGrid, crs: CrsCode) -> RasterResult<Vec<u8>> {
    let raw: Vec<u8> = grid.values.iter().flat_map(|v| v.to_le_bytes()).collect();
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&raw)?;
    let strip = encoder.finish()?;

    let mut entries = vec![
        IfdEntry::long(TAG_IMAGE_WIDTH, grid.width as u32),
        IfdEntry::long(TAG_IMAGE_LENGTH, grid.height as u32),
        IfdEntry::short(TAG_BITS_PER_SAMPLE, 32),
        IfdEntry::short(TAG_COMPRESSION, COMPRESSION_DEFLATE),
        IfdEntry::short(TAG_PHOTOMETRIC, 1),
        IfdEntry::long(TAG_STRIP_OFFSETS, HEADER_LEN as u32),
        IfdEntry::short(TAG_SAMPLES_PER_PIXEL, 1),
        IfdEntry::long(TAG_ROWS_PER_STRIP, grid.height as u32),
        IfdEntry::long(TAG_STRIP_BYTE_COUNTS, strip.len() as u32),
        IfdEntry::short(TAG_PLANAR_CONFIG, 1),
        IfdEntry::short(TAG_SAMPLE_FORMAT, SAMPLE_FORMAT_FLOAT),
        IfdEntry::doubles(
            TAG_MODEL_PIXEL_SCALE,
            &[grid.cell_width, grid.cell_height, 0.0],
        ),
        IfdEntry::doubles(
            TAG_MODEL_TIEPOINT,
            &[0.0, 0.0, 0.0, grid.west, grid.north, 0.0],
        ),
        IfdEntry::shorts(
            TAG_GEO_KEY_DIRECTORY,
            &[
                1, 1, 0, 3,
                GT_MODEL_TYPE, 0, 1, MODEL_TYPE_GEOGRAPHIC,
                GT_RASTER_TYPE, 0, 1, RASTER_PIXEL_IS_AREA,
                GEOGRAPHIC_TYPE, 0, 1, crs.epsg(),
            ],
        ),
        IfdEntry::ascii(TAG_GDAL_NODATA, "nan"),
    ];
    entries.sort_by_key(|e| e.tag);

    let mut out = Vec::with_capacity(HEADER_LEN + strip.len() + 512);
    out.extend_from_slice(b"II");
    out.extend_from_slice(&42u16.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes()); // patched below
    out.extend_from_slice(&strip);
    pad_to_word(&mut out);

    // Out-of-line values go before the IFD; record their offsets.
    let mut offsets = Vec::with_capacity(entries.len());
    for entry in &entries {
        if entry.data.len() > 4 {
            offsets.push(Some(out.len() as u32));
            out.extend_from_slice(&entry.data);
            pad_to_word(&mut out);
        } else {
            offsets.push(None);
        }
    }

    let ifd_offset = out.len() as u32;
    out[4..8].copy_from_slice(&ifd_offset.to_le_bytes());

    out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    for (entry, offset) in entries.iter().zip(offsets) {
        out.extend_from_slice(&entry.tag.to_le_bytes());
        out.extend_from_slice(&entry.field_type.to_le_bytes());
        out.extend_from_slice(&entry.count.to_le_bytes());
        match offset {
            Some(offset) => out.extend_from_slice(&offset.to_le_bytes()),
            None => {
                let mut value = [0u8; 4];
                value[..entry.data.len()].copy_from_slice(&entry.data);
                out.extend_from_slice(&value);
            }
        }
    }
    out.extend_from_slice(&0u32.to_le_bytes());

    debug_assert_eq!(
        out.len(),
        ifd_offset as usize + 2 + entries.len() * IFD_ENTRY_LEN + 4
    );
    Ok(out)
}

/// Encode and write a GeoTIFF to disk.
pub fn write_geotiff(path: &Path, grid: &RasterGrid, crs: CrsCode) -> RasterResult<()> {
    let bytes = encode_geotiff(grid, crs)?;
    std::fs::write(path, &bytes)?;
    debug!(path = %path.display(), size = bytes.len(), "Wrote GeoTIFF");
    Ok(())
}

fn pad_to_word(out: &mut Vec<u8>) {
    if out.len() % 2 == 1 {
        out.push(0);
    }
}
