// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    validation = { EngineError::Validation("bad".into()), ErrorKind::Validation, false },
    transient = { EngineError::Transient("lock".into()), ErrorKind::Transient, true },
    agent_failure = { EngineError::AgentFailure("exit 1".into()), ErrorKind::AgentFailure, false },
    resource = { EngineError::Resource("no worktree".into()), ErrorKind::Resource, false },
    cancelled = { EngineError::Cancelled, ErrorKind::Cancelled, false },
    critical = { EngineError::Critical("corrupt".into()), ErrorKind::Critical, false },
)]
fn classifies_kind_and_retryable(err: EngineError, kind: ErrorKind, retryable: bool) {
    assert_eq!(err.kind(), kind);
    assert_eq!(err.retryable(), retryable);
}

#[test]
fn cancelled_display_contains_the_substring_cancelled() {
    let err = EngineError::Cancelled;
    assert!(err.is_cancelled());
    assert!(err.to_string().contains("Cancelled"));
}

#[test]
fn non_cancelled_errors_are_not_flagged_cancelled() {
    assert!(!EngineError::Resource("x".into()).is_cancelled());
}

#[test]
fn timed_out_adapter_error_becomes_transient() {
    let e: EngineError = AgentAdapterError::TimedOut(std::time::Duration::from_secs(1)).into();
    assert_eq!(e.kind(), ErrorKind::Transient);
}

#[test]
fn spawn_failed_adapter_error_becomes_agent_failure() {
    let e: EngineError = AgentAdapterError::SpawnFailed("enoent".into()).into();
    assert_eq!(e.kind(), ErrorKind::AgentFailure);
}
