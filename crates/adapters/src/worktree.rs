// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Git worktree lifecycle for isolated pipeline execution.
//!
//! Each pipeline run gets its own worktree, checked out at the run's
//! `base_commit_sha`, under a configured base path in a `run_id`-derived
//! subdirectory. The worktree shares the parent repository's object
//! database but has its own index and HEAD, so concurrent runs never
//! collide on checked-out files.

use crate::subprocess::{run_with_timeout, GIT_WORKTREE_TIMEOUT};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum WorktreeError {
    #[error("git command failed: {0}")]
    GitFailed(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A created worktree: its filesystem path and the branch checked out in it.
#[derive(Debug, Clone)]
pub struct Worktree {
    pub path: PathBuf,
    pub branch: String,
}

/// Creates and releases worktrees under a configured base directory.
pub struct WorktreeManager {
    base_path: PathBuf,
}

impl WorktreeManager {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    /// The filesystem path `create` will use for `run_id`, without creating
    /// anything. Lets a caller that needs to provision a resource (e.g. a
    /// sandbox container's bind mount) at the same path ahead of `create`.
    pub fn path_for(&self, run_id: &str) -> PathBuf {
        self.base_path.join(run_id)
    }

    /// Create a worktree for `run_id` off `repo_path`, checked out at
    /// `base_commit_sha` on a fresh branch named after the run.
    pub async fn create(
        &self,
        repo_path: &Path,
        run_id: &str,
        base_commit_sha: &str,
    ) -> Result<Worktree, WorktreeError> {
        tokio::fs::create_dir_all(&self.base_path).await?;
        let path = self.base_path.join(run_id);
        let branch = format!("noldarim/{run_id}");

        let mut cmd = Command::new("git");
        cmd.arg("worktree")
            .arg("add")
            .arg("-b")
            .arg(&branch)
            .arg(&path)
            .arg(base_commit_sha)
            .current_dir(repo_path);

        let output = run_with_timeout(cmd, GIT_WORKTREE_TIMEOUT, "git worktree add")
            .await
            .map_err(WorktreeError::GitFailed)?;
        if !output.status.success() {
            return Err(WorktreeError::GitFailed(
                String::from_utf8_lossy(&output.stderr).into_owned(),
            ));
        }

        Ok(Worktree { path, branch })
    }

    /// Numstat diff of the worktree against `base_commit_sha`: returns
    /// `(files_changed, insertions, deletions)` summed across all files.
    pub async fn diff_numstat(
        &self,
        worktree: &Worktree,
        base_commit_sha: &str,
    ) -> Result<(u32, u32, u32), WorktreeError> {
        let mut cmd = Command::new("git");
        cmd.arg("diff")
            .arg("--numstat")
            .arg(base_commit_sha)
            .current_dir(&worktree.path);
        let output = run_with_timeout(cmd, GIT_WORKTREE_TIMEOUT, "git diff --numstat")
            .await
            .map_err(WorktreeError::GitFailed)?;
        if !output.status.success() {
            return Err(WorktreeError::GitFailed(
                String::from_utf8_lossy(&output.stderr).into_owned(),
            ));
        }

        let text = String::from_utf8_lossy(&output.stdout);
        let mut files = 0u32;
        let mut insertions = 0u32;
        let mut deletions = 0u32;
        for line in text.lines() {
            let mut cols = line.split('\t');
            let added = cols.next().and_then(|s| s.parse::<u32>().ok());
            let removed = cols.next().and_then(|s| s.parse::<u32>().ok());
            if let (Some(a), Some(r)) = (added, removed) {
                files += 1;
                insertions += a;
                deletions += r;
            }
        }
        Ok((files, insertions, deletions))
    }

    /// Full unified diff of the worktree against `base_commit_sha`.
    pub async fn diff(
        &self,
        worktree: &Worktree,
        base_commit_sha: &str,
    ) -> Result<String, WorktreeError> {
        let mut cmd = Command::new("git");
        cmd.arg("diff").arg(base_commit_sha).current_dir(&worktree.path);
        let output = run_with_timeout(cmd, GIT_WORKTREE_TIMEOUT, "git diff")
            .await
            .map_err(WorktreeError::GitFailed)?;
        if !output.status.success() {
            return Err(WorktreeError::GitFailed(
                String::from_utf8_lossy(&output.stderr).into_owned(),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Stage everything and commit, returning the new commit SHA. Returns
    /// `Ok(None)` if there was nothing to commit.
    pub async fn commit(
        &self,
        worktree: &Worktree,
        message: &str,
    ) -> Result<Option<String>, WorktreeError> {
        let mut add = Command::new("git");
        add.arg("add").arg("-A").current_dir(&worktree.path);
        run_with_timeout(add, GIT_WORKTREE_TIMEOUT, "git add")
            .await
            .map_err(WorktreeError::GitFailed)?;

        let mut status = Command::new("git");
        status
            .arg("status")
            .arg("--porcelain")
            .current_dir(&worktree.path);
        let status_output = run_with_timeout(status, GIT_WORKTREE_TIMEOUT, "git status")
            .await
            .map_err(WorktreeError::GitFailed)?;
        if status_output.stdout.is_empty() {
            return Ok(None);
        }

        let mut commit = Command::new("git");
        commit
            .arg("commit")
            .arg("-m")
            .arg(message)
            .current_dir(&worktree.path);
        let commit_output = run_with_timeout(commit, GIT_WORKTREE_TIMEOUT, "git commit")
            .await
            .map_err(WorktreeError::GitFailed)?;
        if !commit_output.status.success() {
            return Err(WorktreeError::GitFailed(
                String::from_utf8_lossy(&commit_output.stderr).into_owned(),
            ));
        }

        let mut rev_parse = Command::new("git");
        rev_parse.arg("rev-parse").arg("HEAD").current_dir(&worktree.path);
        let rev_output = run_with_timeout(rev_parse, GIT_WORKTREE_TIMEOUT, "git rev-parse")
            .await
            .map_err(WorktreeError::GitFailed)?;
        Ok(Some(
            String::from_utf8_lossy(&rev_output.stdout).trim().to_string(),
        ))
    }

    /// Remove the worktree directory and prune its registration. Best-effort
    /// on the `git worktree remove` step since the directory may already be
    /// gone; always attempts the directory cleanup.
    pub async fn release(&self, repo_path: &Path, worktree: &Worktree) -> Result<(), WorktreeError> {
        let mut remove = Command::new("git");
        remove
            .arg("worktree")
            .arg("remove")
            .arg("--force")
            .arg(&worktree.path)
            .current_dir(repo_path);
        let _ = run_with_timeout(remove, GIT_WORKTREE_TIMEOUT, "git worktree remove").await;

        if worktree.path.exists() {
            tokio::fs::remove_dir_all(&worktree.path).await?;
        }

        let mut prune = Command::new("git");
        prune.arg("worktree").arg("prune").current_dir(repo_path);
        let _ = run_with_timeout(prune, GIT_WORKTREE_TIMEOUT, "git worktree prune").await;

        Ok(())
    }
}

#[cfg(test)]
#[path = "worktree_tests.rs"]
mod tests;
