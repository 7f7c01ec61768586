// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `DaemonConfig`: the small set of environment variables the daemon binary
//! reads at startup. Nothing downstream of this module does its own env
//! parsing — `noldarim-engine`/`noldarim-adapters` take plain config
//! structs built here.

use std::path::PathBuf;

const DEFAULT_CONTAINER_IMAGE: &str = "noldarim/agent-sandbox:latest";
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:7420";

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub repo_path: PathBuf,
    pub worktree_base: PathBuf,
    pub transcript_dir: PathBuf,
    pub container_image: String,
    pub wal_path: PathBuf,
    pub snapshot_path: PathBuf,
    pub bind_addr: String,
}

impl DaemonConfig {
    /// Reads `NOLDARIM_REPO_PATH`, `NOLDARIM_WORKTREE_BASE`,
    /// `NOLDARIM_TRANSCRIPT_DIR`, `NOLDARIM_CONTAINER_IMAGE`,
    /// `NOLDARIM_WAL_PATH`, `NOLDARIM_BIND_ADDR`, falling back to
    /// `dirs`-derived defaults under the user's state directory.
    pub fn from_env() -> Self {
        let state_dir = default_state_dir();

        let wal_path = std::env::var("NOLDARIM_WAL_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| state_dir.join("wal.jsonl"));
        let snapshot_path = wal_path
            .parent()
            .map(|p| p.join("snapshot.zst"))
            .unwrap_or_else(|| state_dir.join("snapshot.zst"));

        Self {
            repo_path: std::env::var("NOLDARIM_REPO_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))),
            worktree_base: std::env::var("NOLDARIM_WORKTREE_BASE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| state_dir.join("worktrees")),
            transcript_dir: std::env::var("NOLDARIM_TRANSCRIPT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| state_dir.join("transcripts")),
            container_image: std::env::var("NOLDARIM_CONTAINER_IMAGE")
                .unwrap_or_else(|_| DEFAULT_CONTAINER_IMAGE.to_string()),
            wal_path,
            snapshot_path,
            bind_addr: std::env::var("NOLDARIM_BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string()),
        }
    }
}

fn default_state_dir() -> PathBuf {
    dirs::state_dir()
        .or_else(dirs::data_local_dir)
        .unwrap_or_else(std::env::temp_dir)
        .join("noldarim")
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
