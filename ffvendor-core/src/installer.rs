//! Acquisition pipeline orchestration.
//!
//! Control flow: scan → (if absent) fetch per candidate → extract → scan
//! (verify) → register. Strictly sequential; candidate sources are probed
//! one at a time and the first success wins. Concurrent invocations against
//! the same destination directory are unsafe; nothing here takes a lock.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::downloader::{Fetch, HttpFetcher};
use crate::error::InstallError;
use crate::receipt::{self, InstallReceipt};
use crate::registrar::{Registrar, Scope, UserEnvRegistrar};
use crate::scanner;
use crate::sources;
use crate::types::{ffmpeg_executable_name, CandidateSource, DownloadedArchive, FFMPEG_PATH_VAR};
use crate::{extractor, paths};

/// Coordinates the whole acquisition pipeline for one destination directory.
pub struct Installer {
    dest_dir: PathBuf,
    scratch_dir: PathBuf,
    executable: String,
    sources: Vec<CandidateSource>,
    fetcher: Box<dyn Fetch>,
    registrar: Box<dyn Registrar>,
}

impl Installer {
    /// Creates an installer with the real fetcher and registrar.
    pub fn new(dest_dir: PathBuf, sources: Vec<CandidateSource>) -> Self {
        Self {
            dest_dir,
            scratch_dir: std::env::temp_dir(),
            executable: ffmpeg_executable_name().to_string(),
            sources,
            fetcher: Box::new(HttpFetcher::new()),
            registrar: Box::new(UserEnvRegistrar),
        }
    }

    /// Creates an installer for the default destination and candidate list,
    /// honoring the operator override from the environment.
    pub fn from_env() -> Result<Self> {
        let dest_dir = paths::ffmpeg_dest_dir()?;
        let override_url = sources::override_from_env();
        let sources = sources::resolve_sources(override_url.as_deref());
        Ok(Self::new(dest_dir, sources))
    }

    /// Replaces the fetcher (e.g. to attach progress reporting, or a
    /// scripted fetcher in tests).
    pub fn with_fetcher(mut self, fetcher: Box<dyn Fetch>) -> Self {
        self.fetcher = fetcher;
        self
    }

    /// Replaces the registrar (e.g. a mock in tests).
    pub fn with_registrar(mut self, registrar: Box<dyn Registrar>) -> Self {
        self.registrar = registrar;
        self
    }

    /// Overrides the scratch directory used for pending downloads.
    pub fn with_scratch_dir(mut self, scratch_dir: PathBuf) -> Self {
        self.scratch_dir = scratch_dir;
        self
    }

    /// Overrides the executable file name searched for.
    pub fn with_executable_name(mut self, executable: impl Into<String>) -> Self {
        self.executable = executable.into();
        self
    }

    /// Runs the pipeline to a terminal state.
    ///
    /// Returns the absolute path of the located executable, already
    /// published under [`FFMPEG_PATH_VAR`]. If the executable is present
    /// before any network activity, the run is a registration-only no-op.
    pub async fn run(&self) -> Result<PathBuf, InstallError> {
        info!(
            "Checking for existing {} under {}",
            self.executable,
            self.dest_dir.display()
        );

        if let Some(existing) = scanner::find_executable(&self.dest_dir, &self.executable) {
            info!("{} already installed at {}", self.executable, existing.display());
            self.register(&existing)?;
            return Ok(existing);
        }

        let archive = self.fetch_first_available().await?;

        let extracted = extractor::extract_archive(&archive.path, &self.dest_dir, archive.format);

        // The scratch archive is deleted regardless of how extraction went;
        // failure to delete is logged, never escalated.
        if let Err(e) = fs::remove_file(&archive.path) {
            warn!("Failed to clean up archive {}: {}", archive.path.display(), e);
        }

        extracted?;

        let found = scanner::find_executable(&self.dest_dir, &self.executable).ok_or_else(|| {
            InstallError::ArtifactMissing {
                executable: self.executable.clone(),
                dir: self.dest_dir.clone(),
            }
        })?;

        info!("Installed {} at {}", self.executable, found.display());

        let receipt = InstallReceipt {
            source_url: archive.source_url,
            bytes_downloaded: archive.bytes,
            executable: found.clone(),
        };
        if let Err(e) = receipt::write_receipt(&self.dest_dir, &receipt) {
            warn!("Failed to write install receipt: {}", e);
        }

        self.register(&found)?;
        Ok(found)
    }

    /// Probes candidates in order, returning the first successful download.
    async fn fetch_first_available(&self) -> Result<DownloadedArchive, InstallError> {
        for (index, source) in self.sources.iter().enumerate() {
            let scratch = paths::archive_scratch_path(&self.scratch_dir, source.format);
            info!(
                "Trying source {}/{}: {}",
                index + 1,
                self.sources.len(),
                source.url
            );

            match self.fetcher.fetch(source, &scratch).await {
                Ok(bytes) => {
                    return Ok(DownloadedArchive {
                        source_url: source.url.clone(),
                        path: scratch,
                        format: source.format,
                        bytes,
                    });
                }
                Err(e) => {
                    warn!("Source {} failed: {:#}; trying next candidate", source.url, e);
                }
            }
        }

        Err(InstallError::SourcesExhausted {
            attempted: self.sources.len(),
        })
    }

    /// Publishes the binding: session first, then the durable user store.
    ///
    /// A session failure is fatal. A durable failure is logged only: the
    /// next run re-registers, and the host can still read the session
    /// binding from this run.
    fn register(&self, executable: &Path) -> Result<(), InstallError> {
        let absolute =
            std::path::absolute(executable).unwrap_or_else(|_| executable.to_path_buf());

        self.registrar
            .publish(FFMPEG_PATH_VAR, &absolute, Scope::Session)
            .context("Failed to set the session environment binding")?;

        if let Err(e) = self.registrar.publish(FFMPEG_PATH_VAR, &absolute, Scope::User) {
            warn!(
                "Could not persist {} for future sessions: {:#}",
                FFMPEG_PATH_VAR, e
            );
        } else {
            info!("{} persisted for future sessions", FFMPEG_PATH_VAR);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    use crate::types::ArchiveFormat;

    // ------------------------------------------------------------------
    // Test doubles
    // ------------------------------------------------------------------

    /// Fetcher that fails the first `fail_first` attempts and then writes
    /// `payload` to the destination.
    struct ScriptedFetcher {
        fail_first: usize,
        payload: Vec<u8>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Fetch for ScriptedFetcher {
        async fn fetch(&self, _source: &CandidateSource, dest: &Path) -> Result<u64> {
            let attempt = self.calls.fetch_add(1, Ordering::SeqCst);
            if attempt < self.fail_first {
                anyhow::bail!("connection refused");
            }
            std::fs::write(dest, &self.payload)?;
            Ok(self.payload.len() as u64)
        }
    }

    #[derive(Default)]
    struct RecordingRegistrar {
        events: Arc<Mutex<Vec<(String, PathBuf, Scope)>>>,
    }

    impl Registrar for RecordingRegistrar {
        fn publish(&self, key: &str, value: &Path, scope: Scope) -> Result<()> {
            self.events
                .lock()
                .unwrap()
                .push((key.to_string(), value.to_path_buf(), scope));
            Ok(())
        }
    }

    // ------------------------------------------------------------------
    // Fixtures
    // ------------------------------------------------------------------

    const EXE: &str = "testtool.exe";

    fn zip_payload(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);

        for (name, data) in entries {
            zip.start_file(*name, options).unwrap();
            zip.write_all(data).unwrap();
        }

        zip.finish().unwrap().into_inner()
    }

    fn test_sources(n: usize) -> Vec<CandidateSource> {
        (0..n)
            .map(|i| {
                CandidateSource::new(format!("https://mirror{}.example/ffmpeg.zip", i), ArchiveFormat::Zip)
            })
            .collect()
    }

    struct Harness {
        _temp: TempDir,
        dest: PathBuf,
        calls: Arc<AtomicUsize>,
        events: Arc<Mutex<Vec<(String, PathBuf, Scope)>>>,
        installer: Installer,
    }

    fn harness(sources: Vec<CandidateSource>, fail_first: usize, payload: Vec<u8>) -> Harness {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("vendor").join("ffmpeg");
        let scratch = temp.path().join("scratch");
        std::fs::create_dir_all(&scratch).unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let registrar = RecordingRegistrar::default();
        let events = registrar.events.clone();

        let installer = Installer::new(dest.clone(), sources)
            .with_executable_name(EXE)
            .with_scratch_dir(scratch)
            .with_fetcher(Box::new(ScriptedFetcher {
                fail_first,
                payload,
                calls: calls.clone(),
            }))
            .with_registrar(Box::new(registrar));

        Harness {
            _temp: temp,
            dest,
            calls,
            events,
            installer,
        }
    }

    // ------------------------------------------------------------------
    // Pipeline properties
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_existing_install_performs_zero_fetches() {
        let h = harness(test_sources(3), 0, Vec::new());

        let bin = h.dest.join("ffmpeg-7.1-essentials_build").join("bin");
        std::fs::create_dir_all(&bin).unwrap();
        std::fs::write(bin.join(EXE), b"MZ").unwrap();

        let installed = h.installer.run().await.unwrap();

        assert!(installed.ends_with(format!("bin/{}", EXE)));
        assert_eq!(h.calls.load(Ordering::SeqCst), 0);

        // Present-or-installed, the binding is still published.
        let events = h.events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].2, Scope::Session);
        assert_eq!(events[1].2, Scope::User);
    }

    #[tokio::test]
    async fn test_fallback_stops_at_first_success() {
        let payload = zip_payload(&[("tool/bin/testtool.exe", b"MZ binary")]);
        let h = harness(test_sources(3), 2, payload);

        let installed = h.installer.run().await.unwrap();

        // Sources 1 and 2 failed, source 3 succeeded: exactly 3 attempts.
        assert_eq!(h.calls.load(Ordering::SeqCst), 3);
        assert!(installed.ends_with("tool/bin/testtool.exe"));
        assert!(installed.exists());
        assert_eq!(std::fs::read(&installed).unwrap(), b"MZ binary");
    }

    #[tokio::test]
    async fn test_all_sources_failing_is_fatal_and_leaves_dest_untouched() {
        let h = harness(test_sources(3), usize::MAX, Vec::new());

        let err = h.installer.run().await.unwrap_err();

        match err {
            InstallError::SourcesExhausted { attempted } => assert_eq!(attempted, 3),
            other => panic!("expected SourcesExhausted, got {}", other),
        }
        assert_eq!(h.calls.load(Ordering::SeqCst), 3);
        // The destination was never created, let alone reset.
        assert!(!h.dest.exists());
        assert!(h.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_successful_run_resets_preexisting_destination() {
        let payload = zip_payload(&[("bin/testtool.exe", b"MZ")]);
        let h = harness(test_sources(1), 0, payload);

        std::fs::create_dir_all(&h.dest).unwrap();
        std::fs::write(h.dest.join("unrelated.txt"), b"left over").unwrap();

        h.installer.run().await.unwrap();

        assert!(!h.dest.join("unrelated.txt").exists());
        assert!(h.dest.join("bin").join(EXE).exists());
    }

    #[tokio::test]
    async fn test_artifact_missing_after_extraction_is_fatal() {
        // Valid archive, wrong layout: no executable anywhere inside.
        let payload = zip_payload(&[("docs/README.txt", b"no binaries here")]);
        let h = harness(test_sources(1), 0, payload);

        let err = h.installer.run().await.unwrap_err();

        match err {
            InstallError::ArtifactMissing { executable, .. } => assert_eq!(executable, EXE),
            other => panic!("expected ArtifactMissing, got {}", other),
        }
        // Nothing gets published on a failed install.
        assert!(h.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_second_run_downloads_nothing() {
        let payload = zip_payload(&[("tool/bin/testtool.exe", b"MZ")]);
        let h = harness(test_sources(2), 0, payload.clone());

        let first = h.installer.run().await.unwrap();
        assert_eq!(h.calls.load(Ordering::SeqCst), 1);

        // Fresh installer over the same destination: the scanner
        // short-circuits before any network activity.
        let calls2 = Arc::new(AtomicUsize::new(0));
        let second_installer = Installer::new(h.dest.clone(), test_sources(2))
            .with_executable_name(EXE)
            .with_fetcher(Box::new(ScriptedFetcher {
                fail_first: 0,
                payload,
                calls: calls2.clone(),
            }))
            .with_registrar(Box::new(RecordingRegistrar::default()));

        let second = second_installer.run().await.unwrap();

        assert_eq!(calls2.load(Ordering::SeqCst), 0);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_receipt_written_on_success() {
        let payload = zip_payload(&[("bin/testtool.exe", b"MZ")]);
        let h = harness(test_sources(3), 1, payload);

        h.installer.run().await.unwrap();

        let receipt = receipt::read_receipt(&h.dest).unwrap();
        // The first source failed, so the receipt names the second.
        assert_eq!(receipt.source_url, "https://mirror1.example/ffmpeg.zip");
        assert!(receipt.executable.ends_with(format!("bin/{}", EXE)));
    }

    #[tokio::test]
    async fn test_archive_scratch_file_is_cleaned_up() {
        let payload = zip_payload(&[("bin/testtool.exe", b"MZ")]);
        let h = harness(test_sources(1), 0, payload);

        h.installer.run().await.unwrap();

        let mut leftovers = std::fs::read_dir(h._temp.path().join("scratch")).unwrap();
        assert!(leftovers.next().is_none(), "scratch archive was not deleted");
    }

    #[tokio::test]
    async fn test_binding_published_session_then_user() {
        let payload = zip_payload(&[("bin/testtool.exe", b"MZ")]);
        let h = harness(test_sources(1), 0, payload);

        let installed = h.installer.run().await.unwrap();

        let events = h.events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].0, FFMPEG_PATH_VAR);
        assert_eq!(events[0].2, Scope::Session);
        assert_eq!(events[1].2, Scope::User);
        // Both scopes carry the same absolute path the run returned.
        assert_eq!(events[0].1, std::path::absolute(&installed).unwrap());
        assert_eq!(events[0].1, events[1].1);
    }
}
