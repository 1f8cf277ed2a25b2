//! Candidate source resolution.
//!
//! Builds the ordered list of download locations the pipeline will probe.
//! An operator can prepend a mirror or pinned build via the `FFVENDOR_URL`
//! environment variable; the built-in defaults always remain as fallbacks so
//! the utility stays self-sufficient out of the box.

use tracing::{debug, warn};

use crate::types::{ArchiveFormat, CandidateSource};

/// Environment variable holding an optional override download URL.
pub const OVERRIDE_URL_VAR: &str = "FFVENDOR_URL";

/// Built-in download locations, in probe order.
///
/// The host product ships on Windows, so the defaults are the two
/// long-standing Windows build distributions. The final candidate is the
/// full gyan.dev build, which is only published as .7z.
const DEFAULT_SOURCES: &[(&str, ArchiveFormat)] = &[
    (
        "https://www.gyan.dev/ffmpeg/builds/ffmpeg-release-essentials.zip",
        ArchiveFormat::Zip,
    ),
    (
        "https://github.com/BtbN/FFmpeg-Builds/releases/latest/download/ffmpeg-master-latest-win64-gpl.zip",
        ArchiveFormat::Zip,
    ),
    (
        "https://www.gyan.dev/ffmpeg/builds/ffmpeg-release-full.7z",
        ArchiveFormat::SevenZip,
    ),
];

/// Reads the override URL from the environment, treating empty values as
/// absent.
pub fn override_from_env() -> Option<String> {
    std::env::var(OVERRIDE_URL_VAR)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Produces the ordered, non-empty candidate list.
///
/// If `override_url` is supplied it is tried first; the built-in defaults
/// follow in fixed order. This step cannot fail: an absent override is
/// valid, and an override with an unrecognized suffix is treated as ZIP.
pub fn resolve_sources(override_url: Option<&str>) -> Vec<CandidateSource> {
    let mut sources = Vec::with_capacity(DEFAULT_SOURCES.len() + 1);

    if let Some(url) = override_url {
        if ArchiveFormat::from_url(url).is_none() {
            warn!(url, "override URL has no recognized archive suffix, assuming zip");
        }
        sources.push(CandidateSource::from_url(url));
    }

    for (url, format) in DEFAULT_SOURCES {
        sources.push(CandidateSource::new(*url, *format));
    }

    debug!(count = sources.len(), "resolved candidate sources");
    sources
}
