// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The observability workflow: one instance per pipeline run, tailing a
//! step's transcript directory and turning raw agent records into
//! `AIActivityBatch`/`AIStreamStart`/`AIStreamEnd` events.
//!
//! There is no durable-workflow engine underneath this crate to register a
//! literal child workflow with, so this is a plain `tokio::spawn`ed task;
//! `ObservabilityHandle` plays the role a workflow handle would (signal the
//! current step, signal termination, await drain).

use noldarim_adapters::agent::transcript::TranscriptTail;
use noldarim_core::{Clock, Event, EventMetadata, RunId, StepId};
use noldarim_storage::Persistence;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch};

/// Records are flushed to the broadcaster at least this often, and sooner
/// if a single poll turns up 256 or more of them.
const BATCH_MAX_RECORDS: usize = 256;
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// A handle to a running observability task: lets the pipeline workflow
/// inform it of step transitions and signal shutdown.
pub struct ObservabilityHandle {
    step_tx: watch::Sender<Option<StepId>>,
    final_status_tx: Option<oneshot::Sender<String>>,
    join: tokio::task::JoinHandle<()>,
}

impl ObservabilityHandle {
    /// Tell the observer which step is currently executing, so new
    /// transcript records are attributed to the right task. `None` means no
    /// step is active (records are buffered until the next transition).
    pub fn set_current_step(&self, step_id: Option<StepId>) {
        let _ = self.step_tx.send(step_id);
    }

    /// Signal termination with the pipeline's final status and wait for the
    /// observer to drain its last batch and exit. Per the observability
    /// contract, the caller should have already waited its own grace period
    /// before calling this.
    pub async fn finish(mut self, final_status: &str) {
        if let Some(tx) = self.final_status_tx.take() {
            let _ = tx.send(final_status.to_string());
        }
        let _ = self.join.await;
    }
}

/// Spawn the observability task for `run_id`, tailing `.jsonl` session
/// files under `transcript_dir`.
pub fn spawn_observability<C: Clock + 'static>(
    run_id: RunId,
    transcript_dir: PathBuf,
    session_id: String,
    persistence: Arc<Persistence>,
    clock: C,
    poll_interval: Option<Duration>,
) -> ObservabilityHandle {
    let (step_tx, step_rx) = watch::channel(None);
    let (final_tx, final_rx) = oneshot::channel();
    let interval = poll_interval.unwrap_or(DEFAULT_POLL_INTERVAL);

    let join = tokio::spawn(observability_loop(
        run_id,
        transcript_dir,
        session_id,
        persistence,
        clock,
        interval,
        step_rx,
        final_rx,
    ));

    ObservabilityHandle {
        step_tx,
        final_status_tx: Some(final_tx),
        join,
    }
}

async fn observability_loop<C: Clock>(
    run_id: RunId,
    transcript_dir: PathBuf,
    session_id: String,
    persistence: Arc<Persistence>,
    clock: C,
    poll_interval: Duration,
    step_rx: watch::Receiver<Option<StepId>>,
    mut final_rx: oneshot::Receiver<String>,
) {
    let mut tails: HashMap<PathBuf, TranscriptTail> = HashMap::new();
    let mut started_tasks: HashSet<String> = HashSet::new();

    loop {
        tokio::select! {
            biased;
            final_status = &mut final_rx => {
                let status = final_status.unwrap_or_else(|_| "unknown".to_string());
                poll_once(&run_id, &transcript_dir, &session_id, &step_rx, &persistence, &clock, &mut tails, &mut started_tasks);
                emit_stream_ends(&run_id, &persistence, &clock, &started_tasks, &status);
                break;
            }
            () = tokio::time::sleep(poll_interval) => {
                poll_once(&run_id, &transcript_dir, &session_id, &step_rx, &persistence, &clock, &mut tails, &mut started_tasks);
            }
        }
    }
}

fn poll_once<C: Clock>(
    run_id: &RunId,
    transcript_dir: &std::path::Path,
    session_id: &str,
    step_rx: &watch::Receiver<Option<StepId>>,
    persistence: &Persistence,
    clock: &C,
    tails: &mut HashMap<PathBuf, TranscriptTail>,
    started_tasks: &mut HashSet<String>,
) {
    let Some(step_id) = step_rx.borrow().clone() else {
        return;
    };
    let task_id = noldarim_core::activity::task_id_for(run_id, &step_id);

    let Ok(entries) = std::fs::read_dir(transcript_dir) else {
        return;
    };
    let files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|x| x == "jsonl"))
        .collect();

    let mut records = Vec::new();
    for file in files {
        let tail = tails.entry(file.clone()).or_default();
        records.extend(tail.read_new(&file, run_id, &task_id, Some(&step_id), session_id));
    }
    if records.is_empty() {
        return;
    }

    if started_tasks.insert(task_id.clone()) {
        publish_or_warn(
            persistence,
            Event::AIStreamStart {
                metadata: EventMetadata::new(format!("stream-start-{task_id}")),
                run_id: run_id.clone(),
                task_id: task_id.clone(),
            },
        );
    }

    for chunk in records.chunks(BATCH_MAX_RECORDS) {
        let first_id = chunk.first().map(|r| r.event_id.as_str().to_string()).unwrap_or_default();
        publish_or_warn(
            persistence,
            Event::AIActivityBatch {
                metadata: EventMetadata::new(format!("batch-{task_id}-{first_id}-{}", clock.now_ms())),
                run_id: run_id.clone(),
                task_id: task_id.clone(),
                records: chunk.to_vec(),
            },
        );
    }
}

fn emit_stream_ends<C: Clock>(
    run_id: &RunId,
    persistence: &Persistence,
    clock: &C,
    started_tasks: &HashSet<String>,
    final_status: &str,
) {
    for task_id in started_tasks {
        publish_or_warn(
            persistence,
            Event::AIStreamEnd {
                metadata: EventMetadata::new(format!("stream-end-{task_id}-{}", clock.now_ms())),
                run_id: run_id.clone(),
                task_id: task_id.clone(),
                final_status: final_status.to_string(),
            },
        );
    }
}

/// Events are published on a best-effort channel per the propagation
/// policy: failure to publish is logged, not retried, since the durable
/// status row remains authoritative regardless.
fn publish_or_warn(persistence: &Persistence, event: Event) {
    if let Err(e) = persistence.publish(event) {
        tracing::warn!(error = %e, "failed to publish observability event");
    }
}

#[cfg(test)]
#[path = "observability_workflow_tests.rs"]
mod tests;
