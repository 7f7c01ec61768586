// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent adapters for the closed set of tools a step may invoke (`claude`,
//! `test`). Both run as a single batch subprocess: argv is already fully
//! rendered by `noldarim_core::AgentConfig::render_argv`, so the adapter's
//! only job is to spawn it, enforce a timeout, and capture output.

mod claude;
mod credentials;
mod test_tool;
pub mod transcript;

pub use claude::{extract_process_name, ClaudeAgentAdapter};
pub use credentials::{copy_credentials, CredentialsError};
pub use test_tool::TestToolAgentAdapter;

#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{AgentCall, FakeAgentAdapter};

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentAdapterError {
    #[error("spawn failed: {0}")]
    SpawnFailed(String),
    #[error("timed out after {0:?}")]
    TimedOut(Duration),
}

/// Captured result of running an agent's argv to completion.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AgentOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub duration_ms: u64,
}

impl AgentOutput {
    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs a closed-set tool's argv to completion in `cwd`. Never interactive:
/// this is invoked once per step and its whole stdout is the agent's
/// output (a structured summary block is parsed out of it downstream).
#[async_trait]
pub trait AgentAdapter: Send + Sync + 'static {
    async fn run(
        &self,
        argv: &[String],
        cwd: &Path,
        env: &[(String, String)],
    ) -> Result<AgentOutput, AgentAdapterError>;
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
