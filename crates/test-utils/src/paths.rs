//! Locating archive files that are too large to commit.

use std::path::{Path, PathBuf};

/// Environment variable naming an extra directory of test files.
pub const TEST_DATA_VAR: &str = "TEST_DATA_DIR";

/// Two levels above this crate's manifest: `crates/test-utils` -> root.
pub fn workspace_root() -> PathBuf {
    let here = Path::new(env!("CARGO_MANIFEST_DIR"));
    here.ancestors()
        .nth(2)
        .map(Path::to_path_buf)
        .unwrap_or_else(|| here.to_path_buf())
}

/// Directories searched for test files, most specific first.
pub fn test_data_dirs() -> Vec<PathBuf> {
    let root = workspace_root();
    let mut dirs: Vec<PathBuf> = std::env::var_os(TEST_DATA_VAR)
        .map(PathBuf::from)
        .into_iter()
        .collect();
    dirs.extend(
        ["grid-decoder", "aggregation"]
            .iter()
            .map(|member| root.join("crates").join(member).join("testdata")),
    );
    dirs.push(root.join("testdata"));
    dirs
}

/// First existing `name` across [`test_data_dirs`].
pub fn find_test_file(name: &str) -> Option<PathBuf> {
    test_data_dirs()
        .into_iter()
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}
