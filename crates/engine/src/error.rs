// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `EngineError`: the typed error surface returned by pipeline, step and
//! observability workflows, classified into the taxonomy each caller needs
//! to decide whether to retry, fail the run, or escalate.

use noldarim_adapters::{AgentAdapterError, ContainerError, CredentialsError, WorktreeError};
use noldarim_storage::PersistenceError;
use thiserror::Error;

/// Which bucket of the error taxonomy a failure falls into. Distinct from
/// `EngineError` itself so callers can match on classification without
/// enumerating every concrete variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad request shape, unknown tool, empty prompt template. Surfaced
    /// synchronously; no workflow is started.
    Validation,
    /// Container runtime hiccup, Git lock contention, transient I/O.
    Transient,
    /// Non-zero agent exit, garbage output: recorded as step failure.
    AgentFailure,
    /// Worktree or container could not be created at all.
    Resource,
    /// User- or parent-initiated cancellation.
    Cancelled,
    /// Invariant violation; published as `CriticalError`, workflow fails.
    Critical,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("transient error: {0}")]
    Transient(String),
    #[error("agent failure: {0}")]
    AgentFailure(String),
    #[error("resource error: {0}")]
    Resource(String),
    #[error("Cancelled by user")]
    Cancelled,
    #[error("critical error: {0}")]
    Critical(String),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Validation(_) => ErrorKind::Validation,
            EngineError::Transient(_) => ErrorKind::Transient,
            EngineError::AgentFailure(_) => ErrorKind::AgentFailure,
            EngineError::Resource(_) => ErrorKind::Resource,
            EngineError::Cancelled => ErrorKind::Cancelled,
            EngineError::Critical(_) => ErrorKind::Critical,
        }
    }

    /// Whether an activity policy should retry this error. Only transient
    /// errors are retryable; everything else is a terminal classification
    /// for the activity that produced it.
    pub fn retryable(&self) -> bool {
        matches!(self, EngineError::Transient(_))
    }

    /// `true` iff `Display` on this error is guaranteed to contain the
    /// literal substring `Cancelled`, per the UI's cancellation detection
    /// rule.
    pub fn is_cancelled(&self) -> bool {
        matches!(self.kind(), ErrorKind::Cancelled)
    }
}

impl From<AgentAdapterError> for EngineError {
    fn from(e: AgentAdapterError) -> Self {
        match e {
            AgentAdapterError::TimedOut(_) => EngineError::Transient(e.to_string()),
            AgentAdapterError::SpawnFailed(_) => EngineError::AgentFailure(e.to_string()),
        }
    }
}

impl From<WorktreeError> for EngineError {
    fn from(e: WorktreeError) -> Self {
        EngineError::Resource(e.to_string())
    }
}

impl From<ContainerError> for EngineError {
    fn from(e: ContainerError) -> Self {
        EngineError::Resource(e.to_string())
    }
}

impl From<CredentialsError> for EngineError {
    fn from(e: CredentialsError) -> Self {
        EngineError::Resource(e.to_string())
    }
}

impl From<PersistenceError> for EngineError {
    fn from(e: PersistenceError) -> Self {
        EngineError::Critical(e.to_string())
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
