//! Core types for the FFmpeg acquisition pipeline.
//!
//! This module defines the foundational types used across the crate:
//! archive formats, download candidates, and the transient handle for a
//! completed download.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Environment variable published with the absolute path of the installed
/// `ffmpeg` executable. The host application reads this at startup.
pub const FFMPEG_PATH_VAR: &str = "FFMPEG_PATH";

/// Returns the platform-specific file name of the FFmpeg executable.
pub fn ffmpeg_executable_name() -> &'static str {
    #[cfg(windows)]
    {
        "ffmpeg.exe"
    }
    #[cfg(not(windows))]
    {
        "ffmpeg"
    }
}

// ============================================================================
// Archive Format
// ============================================================================

/// Container format of a downloaded FFmpeg build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArchiveFormat {
    /// ZIP archive (.zip), extracted in-process.
    Zip,
    /// 7-Zip archive (.7z), extracted via an external `7z` binary.
    SevenZip,
}

impl ArchiveFormat {
    /// Infers the archive format from a URL or filename suffix.
    pub fn from_url(url: &str) -> Option<Self> {
        let lower = url.to_lowercase();
        if lower.ends_with(".zip") {
            Some(Self::Zip)
        } else if lower.ends_with(".7z") {
            Some(Self::SevenZip)
        } else {
            None
        }
    }

    /// Returns the file suffix used for the scratch download file, so the
    /// extractor can dispatch on it later.
    pub fn file_suffix(&self) -> &'static str {
        match self {
            Self::Zip => ".zip",
            Self::SevenZip => ".7z",
        }
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Zip => write!(f, "zip"),
            Self::SevenZip => write!(f, "7z"),
        }
    }
}

// ============================================================================
// Candidate Source
// ============================================================================

/// One remote location the pipeline may attempt to download from.
///
/// Candidates are probed strictly in list order; the position in the list
/// defines priority. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateSource {
    /// The download URL.
    pub url: String,
    /// Container format, derived from the URL suffix.
    pub format: ArchiveFormat,
}

impl CandidateSource {
    /// Creates a candidate with an explicit format.
    pub fn new(url: impl Into<String>, format: ArchiveFormat) -> Self {
        Self {
            url: url.into(),
            format,
        }
    }

    /// Creates a candidate, deriving the format from the URL suffix.
    ///
    /// Unrecognized suffixes are assumed to be ZIP so that an operator
    /// override can never make source resolution fail.
    pub fn from_url(url: impl Into<String>) -> Self {
        let url = url.into();
        let format = ArchiveFormat::from_url(&url).unwrap_or(ArchiveFormat::Zip);
        Self { url, format }
    }
}

// ============================================================================
// Downloaded Archive
// ============================================================================

/// Handle for a successfully downloaded archive, owned transiently until it
/// is consumed by the extractor and deleted.
#[derive(Debug, Clone)]
pub struct DownloadedArchive {
    /// URL the archive was fetched from.
    pub source_url: String,
    /// Location of the archive on disk.
    pub path: PathBuf,
    /// Container format, carried over from the candidate source.
    pub format: ArchiveFormat,
    /// Total bytes written to disk.
    pub bytes: u64,
}
