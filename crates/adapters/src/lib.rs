// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Adapters for external I/O: agent subprocess execution, transcript
//! tailing, git worktree lifecycle and sandbox containers.

pub mod agent;
pub mod container;
pub mod env;
pub mod subprocess;
pub mod traced;
pub mod worktree;

pub use agent::{
    copy_credentials, extract_process_name, AgentAdapter, AgentAdapterError, AgentOutput,
    ClaudeAgentAdapter, CredentialsError, TestToolAgentAdapter,
};
pub use container::{Container, ContainerAgentAdapter, ContainerError, ContainerRuntime, ResourceLimits};
pub use traced::TracedAgent;
pub use worktree::{Worktree, WorktreeError, WorktreeManager};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use agent::{AgentCall, FakeAgentAdapter};
