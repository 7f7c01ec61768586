// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrapper for consistent observability.

use crate::agent::{AgentAdapter, AgentAdapterError, AgentOutput};
use async_trait::async_trait;
use std::path::Path;
use tracing::Instrument;

/// Wrapper that adds tracing spans and structured logging to any
/// `AgentAdapter`.
#[derive(Clone)]
pub struct TracedAgent<A> {
    inner: A,
}

impl<A> TracedAgent<A> {
    pub fn new(inner: A) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<A: AgentAdapter> AgentAdapter for TracedAgent<A> {
    async fn run(
        &self,
        argv: &[String],
        cwd: &Path,
        env: &[(String, String)],
    ) -> Result<AgentOutput, AgentAdapterError> {
        let span = tracing::info_span!("agent.run", cwd = %cwd.display(), argv_len = argv.len());
        async {
            tracing::info!(env_count = env.len(), "starting");
            let start = std::time::Instant::now();
            let result = self.inner.run(argv, cwd, env).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(output) => tracing::info!(
                    elapsed_ms,
                    exit_code = ?output.exit_code,
                    "agent finished"
                ),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "run failed"),
            }
            result
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
