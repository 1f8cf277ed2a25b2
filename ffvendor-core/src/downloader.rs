//! Streaming file download with progress reporting.
//!
//! One call performs exactly one retrieval attempt against one candidate
//! source. Every failure mode (bad URL, connect, TLS, non-success status,
//! body read, disk write) surfaces as an error to the caller; the pipeline
//! treats such errors as "try the next candidate" rather than aborting.

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use std::path::Path;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use url::Url;

use crate::types::CandidateSource;

/// Connect timeout applied to each download attempt.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Validates that a URL is usable for downloading.
///
/// Operators may redirect to internal mirrors, so any http(s) host is
/// accepted; only non-web schemes (file:, ftp:, ...) are rejected.
fn validate_url(url_str: &str) -> Result<()> {
    let url = Url::parse(url_str).with_context(|| format!("Invalid URL: {}", url_str))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        anyhow::bail!("URL must use http or https: {}", url_str);
    }

    if url.host_str().is_none() {
        anyhow::bail!("URL must have a host: {}", url_str);
    }

    Ok(())
}

// ============================================================================
// Download Progress
// ============================================================================

/// Progress information during a download.
#[derive(Debug, Clone)]
pub struct DownloadProgress {
    /// Bytes downloaded so far.
    pub bytes_downloaded: u64,
    /// Total bytes expected (if known from Content-Length header).
    pub total_bytes: Option<u64>,
    /// Progress percentage (0.0 to 100.0), or None if total is unknown.
    pub percent: Option<f32>,
}

impl DownloadProgress {
    fn new(bytes_downloaded: u64, total_bytes: Option<u64>) -> Self {
        let percent = total_bytes.map(|total| {
            if total > 0 {
                (bytes_downloaded as f32 / total as f32) * 100.0
            } else {
                0.0
            }
        });

        Self {
            bytes_downloaded,
            total_bytes,
            percent,
        }
    }
}

// ============================================================================
// Download Function
// ============================================================================

/// Downloads a file from a URL with streaming and progress reporting.
///
/// Returns the total number of bytes downloaded. On failure the partially
/// written file is removed best-effort before the error is returned.
pub async fn download_file<F>(url: &str, dest: &Path, progress_cb: F) -> Result<u64>
where
    F: Fn(DownloadProgress),
{
    info!("Downloading {} to {}", url, dest.display());

    validate_url(url)?;

    // Ensure parent directory exists
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    match stream_to_file(url, dest, progress_cb).await {
        Ok(bytes) => {
            info!("Download complete: {} bytes written to {}", bytes, dest.display());
            Ok(bytes)
        }
        Err(e) => {
            // Don't leave a truncated archive behind for a later attempt to
            // trip over.
            let _ = tokio::fs::remove_file(dest).await;
            Err(e)
        }
    }
}

async fn stream_to_file<F>(url: &str, dest: &Path, progress_cb: F) -> Result<u64>
where
    F: Fn(DownloadProgress),
{
    let client = reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .build()
        .context("Failed to build HTTP client")?;

    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to start download from {}", url))?;

    let status = response.status();
    if !status.is_success() {
        anyhow::bail!(
            "Download failed with status {}: {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown error")
        );
    }

    let total_bytes = response.content_length();
    debug!("Content-Length: {:?}", total_bytes);

    let mut file = File::create(dest)
        .await
        .with_context(|| format!("Failed to create file: {}", dest.display()))?;

    let mut stream = response.bytes_stream();
    let mut bytes_downloaded: u64 = 0;

    progress_cb(DownloadProgress::new(0, total_bytes));

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.with_context(|| "Failed to read chunk from response stream")?;

        file.write_all(&chunk)
            .await
            .with_context(|| "Failed to write chunk to file")?;

        bytes_downloaded += chunk.len() as u64;
        progress_cb(DownloadProgress::new(bytes_downloaded, total_bytes));
    }

    file.flush().await.context("Failed to flush file")?;

    Ok(bytes_downloaded)
}

// ============================================================================
// Fetcher Seam
// ============================================================================

/// One download attempt against one candidate source.
///
/// The pipeline depends on this trait rather than on [`download_file`]
/// directly so tests can script per-candidate outcomes.
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Attempts exactly one retrieval of `source`, writing to `dest`.
    async fn fetch(&self, source: &CandidateSource, dest: &Path) -> Result<u64>;
}

/// Real fetcher backed by [`download_file`].
pub struct HttpFetcher {
    progress: Box<dyn Fn(DownloadProgress) + Send + Sync>,
}

impl HttpFetcher {
    /// Creates a fetcher that discards progress updates.
    pub fn new() -> Self {
        Self {
            progress: Box::new(|_| {}),
        }
    }

    /// Creates a fetcher that forwards progress updates to `cb`.
    pub fn with_progress<F>(cb: F) -> Self
    where
        F: Fn(DownloadProgress) + Send + Sync + 'static,
    {
        Self {
            progress: Box::new(cb),
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, source: &CandidateSource, dest: &Path) -> Result<u64> {
        download_file(&source.url, dest, &self.progress).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_progress_calculation() {
        let progress = DownloadProgress::new(50, Some(100));
        assert_eq!(progress.bytes_downloaded, 50);
        assert_eq!(progress.total_bytes, Some(100));
        assert_eq!(progress.percent, Some(50.0));

        let progress_no_total = DownloadProgress::new(50, None);
        assert_eq!(progress_no_total.percent, None);

        let progress_zero_total = DownloadProgress::new(0, Some(0));
        assert_eq!(progress_zero_total.percent, Some(0.0));
    }

    #[test]
    fn test_download_progress_full() {
        let progress = DownloadProgress::new(100, Some(100));
        assert_eq!(progress.percent, Some(100.0));
    }

    #[test]
    fn test_validate_url_schemes() {
        assert!(validate_url("https://www.gyan.dev/ffmpeg/builds/x.zip").is_ok());
        assert!(validate_url("http://mirror.internal/ffmpeg.zip").is_ok());
        assert!(validate_url("file:///etc/passwd").is_err());
        assert!(validate_url("ftp://mirror/ffmpeg.zip").is_err());
    }

    #[test]
    fn test_validate_url_invalid() {
        assert!(validate_url("not-a-url").is_err());
        assert!(validate_url("").is_err());
    }

    #[tokio::test]
    async fn test_unresolvable_host_is_an_error_not_a_panic() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let dest = temp_dir.path().join("out.zip");

        let result = download_file(
            "https://ffvendor-test.invalid/ffmpeg.zip",
            &dest,
            |_| {},
        )
        .await;

        assert!(result.is_err());
        // Failed attempts must not leave partial files behind.
        assert!(!dest.exists());
    }
}
