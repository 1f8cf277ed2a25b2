//! Archive extraction into a freshly reset destination directory.
//!
//! Extraction always starts by removing the destination wholesale and
//! recreating it empty, so a failed earlier install can never leave stale
//! binaries that masquerade as a successful one. ZIP archives are unpacked
//! in-process; .7z archives require an external `7z` binary on the search
//! path.

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io;
use std::path::Path;
use std::process::Command;
use tracing::{debug, info, warn};

use crate::error::InstallError;
use crate::types::ArchiveFormat;

/// Name of the external decompressor required for .7z archives.
pub const SEVEN_ZIP_TOOL: &str = "7z";

/// Extracts an archive into `dest_dir`, resetting the directory first.
///
/// No partial or merged states are permitted between install attempts: any
/// pre-existing destination is deleted wholesale before extraction begins.
/// Failure to remove it is fatal (no retry semantics).
pub fn extract_archive(
    archive_path: &Path,
    dest_dir: &Path,
    format: ArchiveFormat,
) -> Result<(), InstallError> {
    info!(
        "Extracting {} archive {} to {}",
        format,
        archive_path.display(),
        dest_dir.display()
    );

    reset_dest_dir(dest_dir)?;

    match format {
        ArchiveFormat::Zip => extract_zip(archive_path, dest_dir)?,
        ArchiveFormat::SevenZip => extract_seven_zip(archive_path, dest_dir)?,
    }

    Ok(())
}

/// Removes any previous install and recreates the destination empty.
fn reset_dest_dir(dest_dir: &Path) -> Result<()> {
    if dest_dir.exists() {
        debug!("Removing previous install at {}", dest_dir.display());
        fs::remove_dir_all(dest_dir).with_context(|| {
            format!("Failed to remove previous install at {}", dest_dir.display())
        })?;
    }

    fs::create_dir_all(dest_dir)
        .with_context(|| format!("Failed to create directory: {}", dest_dir.display()))?;

    Ok(())
}

// ============================================================================
// ZIP Extraction
// ============================================================================

fn extract_zip(archive_path: &Path, dest_dir: &Path) -> Result<()> {
    let file = File::open(archive_path)
        .with_context(|| format!("Failed to open zip: {}", archive_path.display()))?;

    let mut archive = zip::ZipArchive::new(file)
        .with_context(|| format!("Failed to read zip: {}", archive_path.display()))?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let entry_path = match entry.enclosed_name() {
            Some(path) => path.to_owned(),
            None => {
                warn!("Skipping unsafe path in zip: {}", entry.name());
                continue;
            }
        };

        let dest_path = dest_dir.join(&entry_path);

        if entry.is_dir() {
            fs::create_dir_all(&dest_path)?;
        } else {
            // Ensure parent directory exists
            if let Some(parent) = dest_path.parent() {
                fs::create_dir_all(parent)?;
            }

            let mut outfile = File::create(&dest_path)
                .with_context(|| format!("Failed to create: {}", dest_path.display()))?;

            io::copy(&mut entry, &mut outfile)?;

            // Set executable permissions on Unix
            #[cfg(unix)]
            set_unix_permissions(&dest_path, entry.unix_mode())?;
        }
    }

    debug!("ZIP extraction complete");
    Ok(())
}

// ============================================================================
// 7z Extraction
// ============================================================================

fn extract_seven_zip(archive_path: &Path, dest_dir: &Path) -> Result<(), InstallError> {
    let seven_zip = which::which(SEVEN_ZIP_TOOL).map_err(|_| InstallError::DecompressorMissing {
        tool: SEVEN_ZIP_TOOL,
    })?;

    debug!("Using external decompressor at {}", seven_zip.display());

    let output = Command::new(&seven_zip)
        .arg("x")
        .arg("-y")
        .arg(format!("-o{}", dest_dir.display()))
        .arg(archive_path)
        .output()
        .with_context(|| format!("Failed to run {}", seven_zip.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow::anyhow!(
            "`{} x` exited with {}: {}",
            SEVEN_ZIP_TOOL,
            output.status,
            stderr.trim()
        )
        .into());
    }

    debug!("7z extraction complete");
    Ok(())
}

// ============================================================================
// Unix Permissions
// ============================================================================

#[cfg(unix)]
fn set_unix_permissions(path: &Path, mode: Option<u32>) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    if let Some(mode) = mode {
        if mode & 0o111 != 0 {
            let permissions = fs::Permissions::from_mode(mode | 0o755);
            fs::set_permissions(path, permissions)
                .with_context(|| format!("Failed to set permissions on {}", path.display()))?;
        }
    }

    Ok(())
}
