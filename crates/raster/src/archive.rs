//! Zip bundling of encoded rasters.

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use crate::error::RasterResult;

/// Bundle named files into a zip archive, in the given order.
///
/// Entry timestamps are fixed so identical inputs give identical archives.
pub fn bundle_rasters(entries: &[(String, Vec<u8>)]) -> RasterResult<Vec<u8>> {
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default());

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, bytes) in entries {
        writer.start_file(name.as_str(), options)?;
        writer.write_all(bytes)?;
    }

    Ok(writer.finish()?.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use zip::ZipArchive;

    #[test]
    fn test_bundle_preserves_entries() {
        let entries = vec![
            ("a_leadtime0.tif".to_string(), vec![1u8, 2, 3]),
            ("a_leadtime1.tif".to_string(), vec![4u8, 5]),
        ];
        let bytes = bundle_rasters(&entries).unwrap();

        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 2);

        let mut first = archive.by_index(0).unwrap();
        assert_eq!(first.name(), "a_leadtime0.tif");
        let mut content = Vec::new();
        first.read_to_end(&mut content).unwrap();
        assert_eq!(content, vec![1, 2, 3]);
    }

    #[test]
    fn test_bundle_is_deterministic() {
        let entries = vec![("x.tif".to_string(), vec![9u8; 64])];
        assert_eq!(
            bundle_rasters(&entries).unwrap(),
            bundle_rasters(&entries).unwrap()
        );
    }
}
