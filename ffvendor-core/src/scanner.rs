//! Recursive search for an installed executable.
//!
//! Release archives nest the binaries inside a version-qualified directory
//! (`ffmpeg-7.1-essentials_build/bin/...`) whose name changes between
//! releases, so the scanner walks the whole destination tree instead of
//! hard-coding a layout. Used both as the network fast-path check and as the
//! post-extraction verification gate.

use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Recursively searches `root` for the first regular file named `file_name`.
///
/// Entries are visited in sorted order so the result is deterministic when
/// duplicates exist. A missing or unreadable `root` is treated as "not
/// found", never as an error.
pub fn find_executable(root: &Path, file_name: &str) -> Option<PathBuf> {
    if !root.is_dir() {
        debug!(root = %root.display(), "scan root does not exist");
        return None;
    }

    for entry in WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if entry.file_type().is_file() && entry.file_name() == file_name {
            debug!(path = %entry.path().display(), "found executable");
            return Some(entry.into_path());
        }
    }

    None
}
