// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Structured summary block parsing. The agent is instructed to terminate
//! its response with a `---SUMMARY---` / `---END SUMMARY---` delimited JSON
//! block; this module extracts it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

const START_MARKER: &str = "---SUMMARY---";
const END_MARKER: &str = "---END SUMMARY---";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepSummary {
    pub reason: String,
    #[serde(default)]
    pub changes: Vec<String>,
}

#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("summary block is not valid JSON: {0}")]
    InvalidJson(String),
}

/// Extract the first summary block from `agent_output`.
///
/// Returns `None` when no block is present (not an error). Returns
/// `Some(Err(_))` when a block is present but its JSON is malformed; this is
/// surfaced on the step result but never fails the pipeline.
pub fn parse_summary(agent_output: &str) -> Option<Result<StepSummary, SummaryError>> {
    let start = agent_output.find(START_MARKER)?;
    let after_start = &agent_output[start + START_MARKER.len()..];
    let end = after_start.find(END_MARKER)?;
    let body = after_start[..end].trim();
    Some(
        serde_json::from_str::<StepSummary>(body)
            .map_err(|e| SummaryError::InvalidJson(e.to_string())),
    )
}

#[cfg(test)]
#[path = "summary_tests.rs"]
mod tests;
