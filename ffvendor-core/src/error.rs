//! Fatal error taxonomy for the acquisition pipeline.
//!
//! Per-source download failures are not represented here; they are absorbed
//! and logged inside the pipeline, which simply advances to the next
//! candidate. Only conditions that terminate the whole run appear below.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal conditions that terminate the pipeline.
#[derive(Debug, Error)]
pub enum InstallError {
    /// Every candidate source failed to produce an archive.
    #[error(
        "all {attempted} download sources failed; set {override_var} to a reachable FFmpeg archive",
        override_var = crate::sources::OVERRIDE_URL_VAR
    )]
    SourcesExhausted {
        /// Number of candidates attempted.
        attempted: usize,
    },

    /// The external decompression tool required for .7z archives is absent.
    #[error(
        "`{tool}` was not found on the search path; install 7-Zip or point {override_var} at a .zip build",
        override_var = crate::sources::OVERRIDE_URL_VAR
    )]
    DecompressorMissing {
        /// Name of the missing tool.
        tool: &'static str,
    },

    /// Extraction completed but the expected executable is not in the tree.
    /// Signals an archive layout mismatch or a corrupted download.
    #[error("{executable} missing after installation under {}", dir.display())]
    ArtifactMissing {
        /// File name that was searched for.
        executable: String,
        /// Destination directory that was searched.
        dir: PathBuf,
    },

    /// Any other fatal condition (destination reset failure, session
    /// registration failure, ...), propagated with context.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
