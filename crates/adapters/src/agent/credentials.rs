// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stages Claude Code credentials for a pipeline's container: the host's
//! `~/.claude.json` always goes in at `/home/noldarim/.claude.json`, and on
//! macOS the OS keychain additionally supplies `.credentials.json`.
//!
//! `copy_credentials` writes into a host-side staging directory shaped like
//! the container's home directory; the caller copies that staging tree in
//! with [`crate::Container::copy_file_in`].

use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::process::Command;

/// Keychain service name the Claude CLI registers its OAuth credentials
/// under on macOS.
const KEYCHAIN_SERVICE: &str = "Claude Code-credentials";

#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no credentials file found at {0}")]
    NotFound(PathBuf),
    #[error("credential acquisition unsupported on this platform: {0}")]
    Unsupported(String),
    #[error("keychain lookup failed: {0}")]
    KeychainLookup(String),
}

/// Locate `~/.claude.json`, honoring `CLAUDE_CONFIG_DIR` the same way the
/// Claude CLI itself does.
fn claude_json_source_path() -> PathBuf {
    std::env::var("CLAUDE_CONFIG_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs::home_dir().unwrap_or_default())
        .join(".claude.json")
}

/// Stage the host's Claude credentials for a container at `staging_dir`,
/// mirroring the container's home directory layout:
/// `staging_dir/.claude.json` and, on macOS, `staging_dir/.claude/.credentials.json`.
///
/// Non-macOS hosts have no keychain to draw OAuth credentials from, so
/// acquisition fails with a clear [`CredentialsError::Unsupported`] once the
/// unconditional `.claude.json` copy is done.
pub async fn copy_credentials(staging_dir: &Path) -> Result<(), CredentialsError> {
    let source = claude_json_source_path();
    if !tokio::fs::try_exists(&source).await.unwrap_or(false) {
        return Err(CredentialsError::NotFound(source));
    }
    tokio::fs::create_dir_all(staging_dir).await?;
    tokio::fs::copy(&source, staging_dir.join(".claude.json")).await?;

    if !cfg!(target_os = "macos") {
        return Err(CredentialsError::Unsupported(
            "Claude credentials live in the macOS keychain; no equivalent source exists on this platform"
                .to_string(),
        ));
    }

    let credentials_json = fetch_keychain_credentials().await?;
    let claude_dir = staging_dir.join(".claude");
    tokio::fs::create_dir_all(&claude_dir).await?;
    tokio::fs::write(claude_dir.join(".credentials.json"), credentials_json).await?;
    Ok(())
}

/// Read the Claude OAuth credentials blob out of the macOS keychain via the
/// `security` CLI, the same way the Claude CLI itself stores it.
async fn fetch_keychain_credentials() -> Result<String, CredentialsError> {
    let output = Command::new("security")
        .args(["find-generic-password", "-s", KEYCHAIN_SERVICE, "-w"])
        .output()
        .await?;
    if !output.status.success() {
        return Err(CredentialsError::KeychainLookup(
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

#[cfg(test)]
#[path = "credentials_tests.rs"]
mod tests;
