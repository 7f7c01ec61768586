// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sandbox container lifecycle: runs each pipeline's agent inside an
//! isolated container with the worktree mounted, resource limits applied,
//! and credentials copied in where the agent needs them.
//!
//! Shells out to the `docker` CLI the same way `worktree.rs` shells out to
//! `git`: no client library, just `Command` plus a bounded timeout.

use crate::agent::{AgentAdapter, AgentAdapterError, AgentOutput};
use crate::subprocess::{run_with_timeout, GIT_WORKTREE_TIMEOUT};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::process::Command;

/// Default timeout for individual container operations (`exec`, file copy).
const CONTAINER_OP_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("container runtime command failed: {0}")]
    CommandFailed(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// CPU/memory/disk ceilings applied to a spawned container.
#[derive(Debug, Clone, Default)]
pub struct ResourceLimits {
    pub cpu_shares: Option<u32>,
    pub memory_mb: Option<u64>,
    pub disk_mb: Option<u64>,
}

/// Launches and stops sandbox containers against the host's configured
/// container runtime.
pub struct ContainerRuntime {
    image: String,
}

impl ContainerRuntime {
    pub fn new(image: impl Into<String>) -> Self {
        Self { image: image.into() }
    }

    /// Launch a container from the configured image with `worktree_path`
    /// bind-mounted at `/workspace`, `limits` applied, and `env` exported.
    pub async fn start(
        &self,
        worktree_path: &Path,
        limits: &ResourceLimits,
        env: &[(String, String)],
    ) -> Result<Container, ContainerError> {
        let mut cmd = Command::new("docker");
        cmd.arg("run")
            .arg("-d")
            .arg("--mount")
            .arg(format!(
                "type=bind,src={},dst=/workspace",
                worktree_path.display()
            ));

        if let Some(cpu_shares) = limits.cpu_shares {
            cmd.arg("--cpu-shares").arg(cpu_shares.to_string());
        }
        if let Some(memory_mb) = limits.memory_mb {
            cmd.arg("--memory").arg(format!("{memory_mb}m"));
        }
        for (key, value) in env {
            cmd.arg("--env").arg(format!("{key}={value}"));
        }
        cmd.arg(&self.image).arg("sleep").arg("infinity");

        let output = run_with_timeout(cmd, GIT_WORKTREE_TIMEOUT, "docker run")
            .await
            .map_err(ContainerError::CommandFailed)?;
        if !output.status.success() {
            return Err(ContainerError::CommandFailed(
                String::from_utf8_lossy(&output.stderr).into_owned(),
            ));
        }

        let container_id = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok(Container { id: container_id })
    }
}

/// A running sandbox container.
pub struct Container {
    id: String,
}

impl Container {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Run `argv` inside the container and capture output.
    pub async fn exec(&self, argv: &[String]) -> Result<std::process::Output, ContainerError> {
        let mut cmd = Command::new("docker");
        cmd.arg("exec").arg(&self.id).args(argv);
        run_with_timeout(cmd, CONTAINER_OP_TIMEOUT, "docker exec")
            .await
            .map_err(ContainerError::CommandFailed)
    }

    /// Write `contents` to `path` inside the container via a piped `exec`.
    pub async fn write_file(&self, path: &str, contents: &[u8]) -> Result<(), ContainerError> {
        let tmp = tempfile::NamedTempFile::new()?;
        tokio::fs::write(tmp.path(), contents).await?;
        self.copy_file_in(tmp.path(), path).await
    }

    /// Copy a host file into the container at `dest_path`.
    pub async fn copy_file_in(
        &self,
        host_path: &Path,
        dest_path: &str,
    ) -> Result<(), ContainerError> {
        let mut cmd = Command::new("docker");
        cmd.arg("cp")
            .arg(host_path)
            .arg(format!("{}:{dest_path}", self.id));
        let output = run_with_timeout(cmd, CONTAINER_OP_TIMEOUT, "docker cp")
            .await
            .map_err(ContainerError::CommandFailed)?;
        if !output.status.success() {
            return Err(ContainerError::CommandFailed(
                String::from_utf8_lossy(&output.stderr).into_owned(),
            ));
        }
        Ok(())
    }

    /// Stop and remove the container within `stop_timeout`, best-effort.
    pub async fn stop(&self, stop_timeout: Duration) -> Result<(), ContainerError> {
        let mut cmd = Command::new("docker");
        cmd.arg("stop")
            .arg("-t")
            .arg(stop_timeout.as_secs().to_string())
            .arg(&self.id);
        let _ = run_with_timeout(cmd, stop_timeout + Duration::from_secs(5), "docker stop").await;

        let mut rm = Command::new("docker");
        rm.arg("rm").arg("-f").arg(&self.id);
        let _ = run_with_timeout(rm, CONTAINER_OP_TIMEOUT, "docker rm").await;
        Ok(())
    }
}

/// Runs a step's argv inside an already-started container by delegating to
/// `docker exec`. `cwd`/`env` are accepted to satisfy `AgentAdapter` but are
/// no-ops here: the worktree is already mounted at the container's working
/// directory and environment variables are baked in at `start()` time.
pub struct ContainerAgentAdapter {
    container: Arc<Container>,
}

impl ContainerAgentAdapter {
    pub fn new(container: Arc<Container>) -> Self {
        Self { container }
    }
}

#[async_trait]
impl AgentAdapter for ContainerAgentAdapter {
    async fn run(
        &self,
        argv: &[String],
        _cwd: &Path,
        _env: &[(String, String)],
    ) -> Result<AgentOutput, AgentAdapterError> {
        let start = Instant::now();
        let output = self
            .container
            .exec(argv)
            .await
            .map_err(|e| AgentAdapterError::SpawnFailed(e.to_string()))?;
        Ok(AgentOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code(),
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }
}

#[cfg(test)]
#[path = "container_tests.rs"]
mod tests;
