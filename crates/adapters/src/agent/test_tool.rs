// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `test` tool adapter: runs the fixed-format `sh -c "<prompt>"` argv
//! `AgentConfig::render_argv` produces for `ToolName::Test` steps, used by
//! integration tests and scripted pipelines that don't need a real model.

use super::{AgentAdapter, AgentAdapterError, AgentOutput};
use crate::subprocess::{run_with_timeout, TEST_TOOL_TIMEOUT};
use async_trait::async_trait;
use std::path::Path;
use std::time::Instant;
use tokio::process::Command;

#[derive(Clone, Default)]
pub struct TestToolAgentAdapter;

impl TestToolAgentAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AgentAdapter for TestToolAgentAdapter {
    async fn run(
        &self,
        argv: &[String],
        cwd: &Path,
        env: &[(String, String)],
    ) -> Result<AgentOutput, AgentAdapterError> {
        let Some((program, args)) = argv.split_first() else {
            return Err(AgentAdapterError::SpawnFailed("empty argv".to_string()));
        };

        let mut cmd = Command::new(program);
        cmd.args(args).current_dir(cwd);
        for (key, value) in env {
            cmd.env(key, value);
        }

        let start = Instant::now();
        let output = run_with_timeout(cmd, TEST_TOOL_TIMEOUT, "test tool")
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
#[path = "test_tool_tests.rs"]
mod tests;
