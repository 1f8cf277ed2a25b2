//! Destination and scratch path resolution.
//!
//! The vendored FFmpeg tree lives in `vendor/ffmpeg/` next to the utility's
//! own executable, so the install travels with the product checkout rather
//! than a per-user cache. Scratch downloads go to the OS temp directory.

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::types::ArchiveFormat;

/// Directory (relative to the utility) that holds vendored third-party tools.
const VENDOR_DIR: &str = "vendor";

/// Subdirectory of [`VENDOR_DIR`] that holds the unpacked FFmpeg tree.
const FFMPEG_DIR: &str = "ffmpeg";

/// Returns the directory containing the currently running executable.
pub fn install_root() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("failed to locate the running executable")?;
    let root = exe
        .parent()
        .context("running executable has no parent directory")?;
    Ok(root.to_path_buf())
}

/// Returns the destination directory for the unpacked FFmpeg tree.
///
/// Path: `<install root>/vendor/ffmpeg/`
pub fn ffmpeg_dest_dir() -> Result<PathBuf> {
    Ok(install_root()?.join(VENDOR_DIR).join(FFMPEG_DIR))
}

/// Returns the scratch path for a pending download inside `scratch_dir`.
///
/// The file suffix mirrors the candidate source's suffix so the extractor
/// can dispatch on it.
pub fn archive_scratch_path(scratch_dir: &std::path::Path, format: ArchiveFormat) -> PathBuf {
    scratch_dir.join(format!("ffmpeg-download{}", format.file_suffix()))
}
