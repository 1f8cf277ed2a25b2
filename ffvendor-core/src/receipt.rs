//! Install receipt persistence.
//!
//! After a successful install the pipeline drops a small JSON receipt into
//! the destination directory recording where the build came from. The
//! receipt is informational (surfaced in logs and diagnostics); presence
//! checks always go through the scanner, so a deleted tree can never
//! masquerade as installed because a receipt survived.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// File name of the receipt inside the destination directory.
pub const RECEIPT_FILE: &str = "install-receipt.json";

/// Record of a completed install.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallReceipt {
    /// URL the archive was downloaded from.
    pub source_url: String,
    /// Total bytes downloaded.
    pub bytes_downloaded: u64,
    /// Absolute path of the located executable.
    pub executable: PathBuf,
}

/// Writes the receipt into `dest_dir`.
pub fn write_receipt(dest_dir: &Path, receipt: &InstallReceipt) -> Result<()> {
    let path = dest_dir.join(RECEIPT_FILE);
    let content = serde_json::to_string_pretty(receipt).context("Failed to serialize receipt")?;

    fs::write(&path, content)
        .with_context(|| format!("Failed to write receipt to {}", path.display()))?;

    debug!("Receipt saved to {}", path.display());
    Ok(())
}

/// Reads the receipt from `dest_dir`, if one exists.
///
/// A missing or corrupt receipt is not an error; it only means no
/// information is available.
pub fn read_receipt(dest_dir: &Path) -> Option<InstallReceipt> {
    let path = dest_dir.join(RECEIPT_FILE);
    let content = fs::read_to_string(&path).ok()?;

    match serde_json::from_str(&content) {
        Ok(receipt) => Some(receipt),
        Err(e) => {
            warn!("Ignoring unreadable receipt at {}: {}", path.display(), e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_receipt_roundtrip() {
        let temp_dir = TempDir::new().unwrap();

        let receipt = InstallReceipt {
            source_url: "https://www.gyan.dev/ffmpeg/builds/ffmpeg-release-essentials.zip"
                .to_string(),
            bytes_downloaded: 31_457_280,
            executable: temp_dir.path().join("bin").join("ffmpeg.exe"),
        };

        write_receipt(temp_dir.path(), &receipt).unwrap();

        let loaded = read_receipt(temp_dir.path()).unwrap();
        assert_eq!(loaded.source_url, receipt.source_url);
        assert_eq!(loaded.bytes_downloaded, 31_457_280);
        assert_eq!(loaded.executable, receipt.executable);
    }

    #[test]
    fn test_missing_receipt_is_none() {
        let temp_dir = TempDir::new().unwrap();
        assert!(read_receipt(temp_dir.path()).is_none());
    }

    #[test]
    fn test_corrupt_receipt_is_none() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(RECEIPT_FILE), "not valid json {{{{").unwrap();
        assert!(read_receipt(temp_dir.path()).is_none());
    }
}
