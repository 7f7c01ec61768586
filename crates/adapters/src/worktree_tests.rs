// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::process::Command as StdCommand;
use tempfile::tempdir;

fn git(repo: &Path, args: &[&str]) {
    let status = StdCommand::new("git")
        .args(args)
        .current_dir(repo)
        .status()
        .expect("git invocation");
    assert!(status.success(), "git {args:?} failed");
}

fn init_repo() -> tempfile::TempDir {
    let dir = tempdir().unwrap();
    git(dir.path(), &["init", "-q"]);
    git(dir.path(), &["config", "user.email", "test@example.com"]);
    git(dir.path(), &["config", "user.name", "test"]);
    std::fs::write(dir.path().join("file.txt"), "hello\n").unwrap();
    git(dir.path(), &["add", "-A"]);
    git(dir.path(), &["commit", "-q", "-m", "initial"]);
    dir
}

fn head_sha(repo: &Path) -> String {
    let output = StdCommand::new("git")
        .args(["rev-parse", "HEAD"])
        .current_dir(repo)
        .output()
        .unwrap();
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

#[tokio::test]
async fn create_checks_out_the_given_commit_into_a_new_directory() {
    let repo = init_repo();
    let base_sha = head_sha(repo.path());
    let base_dir = tempdir().unwrap();
    let manager = WorktreeManager::new(base_dir.path().to_path_buf());

    let worktree = manager.create(repo.path(), "run-1", &base_sha).await.unwrap();

    assert!(worktree.path.join("file.txt").exists());
    assert_eq!(worktree.branch, "noldarim/run-1");
}

#[tokio::test]
async fn diff_numstat_reports_changed_files() {
    let repo = init_repo();
    let base_sha = head_sha(repo.path());
    let base_dir = tempdir().unwrap();
    let manager = WorktreeManager::new(base_dir.path().to_path_buf());
    let worktree = manager.create(repo.path(), "run-2", &base_sha).await.unwrap();

    std::fs::write(worktree.path.join("file.txt"), "hello\nworld\n").unwrap();

    let (files, insertions, _deletions) =
        manager.diff_numstat(&worktree, &base_sha).await.unwrap();
    assert_eq!(files, 1);
    assert_eq!(insertions, 1);
}

#[tokio::test]
async fn commit_returns_none_when_nothing_changed() {
    let repo = init_repo();
    let base_sha = head_sha(repo.path());
    let base_dir = tempdir().unwrap();
    let manager = WorktreeManager::new(base_dir.path().to_path_buf());
    let worktree = manager.create(repo.path(), "run-3", &base_sha).await.unwrap();

    let result = manager.commit(&worktree, "no-op").await.unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn commit_creates_a_new_revision_when_files_changed() {
    let repo = init_repo();
    let base_sha = head_sha(repo.path());
    let base_dir = tempdir().unwrap();
    let manager = WorktreeManager::new(base_dir.path().to_path_buf());
    let worktree = manager.create(repo.path(), "run-4", &base_sha).await.unwrap();
    std::fs::write(worktree.path.join("new.txt"), "content\n").unwrap();

    let sha = manager.commit(&worktree, "add file").await.unwrap();
    assert!(sha.is_some());
    assert_ne!(sha.unwrap(), base_sha);
}

#[tokio::test]
async fn release_removes_the_worktree_directory() {
    let repo = init_repo();
    let base_sha = head_sha(repo.path());
    let base_dir = tempdir().unwrap();
    let manager = WorktreeManager::new(base_dir.path().to_path_buf());
    let worktree = manager.create(repo.path(), "run-5", &base_sha).await.unwrap();

    manager.release(repo.path(), &worktree).await.unwrap();

    assert!(!worktree.path.exists());
}

#[test]
fn path_for_matches_the_path_create_would_use() {
    let base_dir = tempdir().unwrap();
    let manager = WorktreeManager::new(base_dir.path().to_path_buf());

    assert_eq!(manager.path_for("run-5"), base_dir.path().join("run-5"));
}

#[tokio::test]
async fn path_for_predicts_creates_eventual_directory() {
    let repo = init_repo();
    let base_sha = head_sha(repo.path());
    let base_dir = tempdir().unwrap();
    let manager = WorktreeManager::new(base_dir.path().to_path_buf());

    let predicted = manager.path_for("run-7");
    assert!(!predicted.exists());

    let worktree = manager.create(repo.path(), "run-7", &base_sha).await.unwrap();
    assert_eq!(worktree.path, predicted);
}
