// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;

fn clear_vars() {
    for key in [
        "NOLDARIM_REPO_PATH",
        "NOLDARIM_WORKTREE_BASE",
        "NOLDARIM_TRANSCRIPT_DIR",
        "NOLDARIM_CONTAINER_IMAGE",
        "NOLDARIM_WAL_PATH",
        "NOLDARIM_BIND_ADDR",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
#[serial]
fn defaults_apply_when_no_env_vars_are_set() {
    clear_vars();
    let config = DaemonConfig::from_env();
    assert_eq!(config.container_image, DEFAULT_CONTAINER_IMAGE);
    assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
    assert!(config.wal_path.ends_with("wal.jsonl"));
}

#[test]
#[serial]
fn explicit_env_vars_override_defaults() {
    clear_vars();
    std::env::set_var("NOLDARIM_REPO_PATH", "/tmp/noldarim-repo");
    std::env::set_var("NOLDARIM_WORKTREE_BASE", "/tmp/noldarim-worktrees");
    std::env::set_var("NOLDARIM_TRANSCRIPT_DIR", "/tmp/noldarim-transcripts");
    std::env::set_var("NOLDARIM_CONTAINER_IMAGE", "custom/image:v2");
    std::env::set_var("NOLDARIM_WAL_PATH", "/tmp/noldarim-wal.jsonl");
    std::env::set_var("NOLDARIM_BIND_ADDR", "0.0.0.0:9000");

    let config = DaemonConfig::from_env();

    assert_eq!(config.repo_path, PathBuf::from("/tmp/noldarim-repo"));
    assert_eq!(config.worktree_base, PathBuf::from("/tmp/noldarim-worktrees"));
    assert_eq!(config.transcript_dir, PathBuf::from("/tmp/noldarim-transcripts"));
    assert_eq!(config.container_image, "custom/image:v2");
    assert_eq!(config.wal_path, PathBuf::from("/tmp/noldarim-wal.jsonl"));
    assert_eq!(config.bind_addr, "0.0.0.0:9000");
    assert_eq!(config.snapshot_path, PathBuf::from("/tmp/noldarim-snapshot.zst"));

    clear_vars();
}
