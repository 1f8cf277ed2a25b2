//! ffvendor Core Library
//!
//! Acquisition pipeline for the FFmpeg executable the streaming stack
//! depends on but does not bundle: locate, download, extract, and register,
//! with no manual install steps for the end user.
//!
//! # Architecture
//!
//! - `types`: Core types (ArchiveFormat, CandidateSource, DownloadedArchive)
//! - `error`: Fatal error taxonomy for the pipeline
//! - `paths`: Destination and scratch path resolution
//! - `sources`: Ordered candidate list (operator override + built-in defaults)
//! - `scanner`: Recursive executable search (fast path + verification gate)
//! - `downloader`: Streaming download with progress reporting
//! - `extractor`: Destination reset + zip/7z extraction
//! - `registrar`: Session + durable environment binding
//! - `receipt`: Informational install receipt
//! - `installer`: Pipeline orchestration
//!
//! # Example
//!
//! ```ignore
//! use ffvendor_core::Installer;
//!
//! let installer = Installer::from_env()?;
//! let ffmpeg = installer.run().await?;
//! println!("FFmpeg available at {}", ffmpeg.display());
//! ```

pub mod downloader;
pub mod error;
pub mod extractor;
pub mod installer;
pub mod paths;
pub mod receipt;
pub mod registrar;
pub mod scanner;
pub mod sources;
pub mod types;

// Re-export commonly used types
pub use downloader::{download_file, DownloadProgress, Fetch, HttpFetcher};
pub use error::InstallError;
pub use extractor::{extract_archive, SEVEN_ZIP_TOOL};
pub use installer::Installer;
pub use receipt::{read_receipt, write_receipt, InstallReceipt};
pub use registrar::{Registrar, Scope, UserEnvRegistrar};
pub use scanner::find_executable;
pub use sources::{override_from_env, resolve_sources, OVERRIDE_URL_VAR};
pub use types::{
    ffmpeg_executable_name, ArchiveFormat, CandidateSource, DownloadedArchive, FFMPEG_PATH_VAR,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
