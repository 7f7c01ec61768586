// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Claude agent adapter: runs `claude --print ...` as a single batch
//! subprocess and captures its output.

use super::{AgentAdapter, AgentAdapterError, AgentOutput};
use crate::subprocess::{run_with_timeout, CLAUDE_RUN_TIMEOUT};
use async_trait::async_trait;
use std::path::Path;
use std::time::Instant;
use tokio::process::Command;

/// Extract the binary basename from argv's first element.
///
/// Handles absolute paths (`/usr/bin/claude` -> `claude`), relative paths
/// (`./claude` -> `claude`), and plain names. Used for logging only.
pub fn extract_process_name(argv: &[String]) -> String {
    argv.first()
        .and_then(|first| first.rsplit('/').next())
        .unwrap_or("claude")
        .to_string()
}

/// Agent adapter for Claude Code, invoked non-interactively via `--print`.
#[derive(Clone, Default)]
pub struct ClaudeAgentAdapter;

impl ClaudeAgentAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AgentAdapter for ClaudeAgentAdapter {
    async fn run(
        &self,
        argv: &[String],
        cwd: &Path,
        env: &[(String, String)],
    ) -> Result<AgentOutput, AgentAdapterError> {
        let Some((program, args)) = argv.split_first() else {
            return Err(AgentAdapterError::SpawnFailed("empty argv".to_string()));
        };

        tracing::info!(
            process = %extract_process_name(argv),
            cwd = %cwd.display(),
            "running claude agent"
        );

        let mut cmd = Command::new(program);
        cmd.args(args).current_dir(cwd);
        for (key, value) in env {
            cmd.env(key, value);
        }

        let start = Instant::now();
        let output = run_with_timeout(cmd, CLAUDE_RUN_TIMEOUT, "claude agent")
            .await
            .map_err(AgentAdapterError::SpawnFailed)?;
        let duration_ms = start.elapsed().as_millis() as u64;

        Ok(AgentOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code(),
            duration_ms,
        })
    }
}

#[cfg(test)]
#[path = "claude_tests.rs"]
mod tests;
