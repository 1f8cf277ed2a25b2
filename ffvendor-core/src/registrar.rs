//! Environment registration for the located executable.
//!
//! The binding has two lifetimes: an ephemeral one for the current process,
//! and a durable one persisted in the user's environment store so future
//! sessions of the host application see it too. Registration is an explicit
//! side-effecting call with a scope parameter, behind a trait, so the
//! pipeline can be driven with a mock in tests.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::{debug, info};

/// Lifetime of a published environment binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Visible to the current process and its children only.
    Session,
    /// Persisted in the user's environment store for future sessions.
    User,
}

/// Publishes an environment binding with an explicit scope.
pub trait Registrar: Send + Sync {
    /// Binds `key` to `value` for the given scope.
    fn publish(&self, key: &str, value: &Path, scope: Scope) -> Result<()>;
}

// ============================================================================
// Real Implementation
// ============================================================================

/// Registrar backed by the process environment and the user's durable store.
///
/// Durable scope uses `setx` on Windows (the user-scoped environment store)
/// and an idempotent `export` line in `~/.profile` elsewhere.
pub struct UserEnvRegistrar;

impl Registrar for UserEnvRegistrar {
    fn publish(&self, key: &str, value: &Path, scope: Scope) -> Result<()> {
        match scope {
            Scope::Session => {
                std::env::set_var(key, value);
                debug!("Session binding set: {}={}", key, value.display());
                Ok(())
            }
            Scope::User => persist_user(key, value),
        }
    }
}

#[cfg(windows)]
fn persist_user(key: &str, value: &Path) -> Result<()> {
    use std::process::Command;

    let output = Command::new("setx")
        .arg(key)
        .arg(value)
        .output()
        .context("Failed to run setx")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("setx exited with {}: {}", output.status, stderr.trim());
    }

    info!("Persisted {} for the current user", key);
    Ok(())
}

#[cfg(not(windows))]
fn persist_user(key: &str, value: &Path) -> Result<()> {
    let profile = dirs::home_dir()
        .context("Could not determine the home directory")?
        .join(".profile");

    write_export_line(&profile, key, value)?;

    info!("Persisted {} in {}", key, profile.display());
    Ok(())
}

/// Rewrites `profile` so it carries exactly one `export key=...` line.
///
/// Any previous line for the same key is dropped first, keeping repeated
/// runs from piling up stale bindings.
#[cfg(not(windows))]
fn write_export_line(profile: &Path, key: &str, value: &Path) -> Result<()> {
    let marker = format!("export {}=", key);
    let existing = match std::fs::read_to_string(profile) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => {
            return Err(e)
                .with_context(|| format!("Failed to read {}", profile.display()));
        }
    };

    let mut lines: Vec<&str> = existing
        .lines()
        .filter(|line| !line.trim_start().starts_with(&marker))
        .collect();

    let export = format!("{}\"{}\"", marker, value.display());
    lines.push(&export);

    let mut content = lines.join("\n");
    content.push('\n');

    std::fs::write(profile, content)
        .with_context(|| format!("Failed to write {}", profile.display()))?;

    Ok(())
}
