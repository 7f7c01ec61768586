// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Pipeline, step and observability workflows: the durable execution core
//! that turns a `StartPipelineRequest` into commits and event streams.

pub mod cancellation;
pub mod error;
pub mod observability_workflow;
pub mod pipeline_workflow;
pub mod step_workflow;

pub use cancellation::CancellationToken;
pub use error::{EngineError, ErrorKind};
pub use observability_workflow::{spawn_observability, ObservabilityHandle};
pub use pipeline_workflow::{run_pipeline, PipelineWorkflowConfig, StartPipelineOutcome, StartPipelineRequest};
pub use step_workflow::{run_step, StepInput, StepWorkflowConfig};
