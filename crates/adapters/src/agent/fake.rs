// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake agent adapter for deterministic testing.

use super::{AgentAdapter, AgentAdapterError, AgentOutput};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Recorded call to `FakeAgentAdapter::run`.
#[derive(Debug, Clone)]
pub struct AgentCall {
    pub argv: Vec<String>,
    pub cwd: PathBuf,
    pub env: Vec<(String, String)>,
}

/// Fake agent adapter that records every `run` call and returns canned
/// outputs in FIFO order, falling back to a default success once exhausted.
#[derive(Clone)]
pub struct FakeAgentAdapter {
    inner: Arc<Mutex<FakeState>>,
}

struct FakeState {
    calls: Vec<AgentCall>,
    queued_outputs: Vec<Result<AgentOutput, AgentAdapterError>>,
    delay: Option<Duration>,
}

impl Default for FakeAgentAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeAgentAdapter {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeState {
                calls: Vec::new(),
                queued_outputs: Vec::new(),
                delay: None,
            })),
        }
    }

    pub fn calls(&self) -> Vec<AgentCall> {
        self.inner.lock().calls.clone()
    }

    /// Queue the output for the next `run` call. Queued outputs are consumed
    /// in order; once empty, `run` returns a default successful output.
    pub fn push_output(&self, output: AgentOutput) {
        self.inner.lock().queued_outputs.push(Ok(output));
    }

    pub fn push_error(&self, error: AgentAdapterError) {
        self.inner.lock().queued_outputs.push(Err(error));
    }

    /// Simulate a slow-running agent, useful for cancellation tests.
    pub fn set_delay(&self, delay: Duration) {
        self.inner.lock().delay = Some(delay);
    }
}

#[async_trait]
impl AgentAdapter for FakeAgentAdapter {
    async fn run(
        &self,
        argv: &[String],
        cwd: &Path,
        env: &[(String, String)],
    ) -> Result<AgentOutput, AgentAdapterError> {
        let (delay, next) = {
            let mut inner = self.inner.lock();
            inner.calls.push(AgentCall {
                argv: argv.to_vec(),
                cwd: cwd.to_owned(),
                env: env.to_vec(),
            });
            let next = if inner.queued_outputs.is_empty() {
                Ok(AgentOutput {
                    stdout: String::new(),
                    stderr: String::new(),
                    exit_code: Some(0),
                    duration_ms: 0,
                })
            } else {
                inner.queued_outputs.remove(0)
            };
            (inner.delay, next)
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        next
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
