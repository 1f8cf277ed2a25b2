//! ffvendor - FFmpeg provisioning for the streaming stack.
//!
//! Takes no arguments. Reads an optional override URL from the environment,
//! then runs the acquisition pipeline: scan, download with fallback,
//! extract, verify, register. Exits non-zero with a one-line diagnostic if
//! no usable FFmpeg can be installed.

use ffvendor_core::{
    DownloadProgress, HttpFetcher, InstallError, Installer, FFMPEG_PATH_VAR, OVERRIDE_URL_VAR,
};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ffvendor_core=info".parse().unwrap())
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting ffvendor v{}", ffvendor_core::VERSION);

    if let Err(e) = run().await {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), InstallError> {
    if let Some(url) = ffvendor_core::override_from_env() {
        println!("Using {} override: {}", OVERRIDE_URL_VAR, url);
    }

    let installer = Installer::from_env()?.with_fetcher(Box::new(HttpFetcher::with_progress(
        report_progress,
    )));

    let ffmpeg = installer.run().await?;

    println!("FFmpeg available at {}", ffmpeg.display());
    println!(
        "{} is set for this session and persisted for future sessions",
        FFMPEG_PATH_VAR
    );
    Ok(())
}

/// Prints download progress at whole-percent steps to keep the output
/// readable on slow links.
fn report_progress(progress: DownloadProgress) {
    use std::sync::atomic::{AtomicU32, Ordering};
    static LAST_PERCENT: AtomicU32 = AtomicU32::new(u32::MAX);

    if let Some(percent) = progress.percent {
        let whole = percent as u32;
        if whole % 10 == 0 && LAST_PERCENT.swap(whole, Ordering::Relaxed) != whole {
            println!("  downloaded {}%", whole);
        }
    }
}
