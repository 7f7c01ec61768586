// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `Persistence`: the read/write facade over projects, runs, step results,
//! and activity records, backed by the WAL plus materialized state.
//! Serializes writers with a per-process lock; ordering only matters where
//! a genuine cross-writer race exists (a step's own result write landing
//! before the pipeline advances
//! `head_commit_sha`), which this single-lock facade trivially satisfies.

use crate::snapshot::{Snapshot, SnapshotError};
use crate::state::MaterializedState;
use crate::wal::{Wal, WalError};
use noldarim_core::{AIActivityRecord, Event, PipelineRun, Project, StepResult, StepSnapshot};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("wal error: {0}")]
    Wal(#[from] WalError),
    #[error("snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),
}

/// Number of newly-processed WAL entries after which a fresh snapshot is
/// taken and the WAL is compacted.
const SNAPSHOT_INTERVAL: u64 = 500;

struct Inner {
    wal: Wal,
    state: MaterializedState,
    last_snapshot_seq: u64,
}

pub struct Persistence {
    inner: Mutex<Inner>,
    snapshot_path: PathBuf,
    sink: Mutex<Option<Arc<dyn Fn(&Event) + Send + Sync>>>,
}

impl Persistence {
    /// Open (or create) persistence at `wal_path`/`snapshot_path`, replaying
    /// the WAL from the last snapshot to rebuild `MaterializedState`.
    pub fn open(wal_path: &Path, snapshot_path: &Path) -> Result<Self, PersistenceError> {
        let existing_snapshot = Snapshot::load(snapshot_path)?;
        let (mut state, processed_seq) = match existing_snapshot {
            Some(s) => (s.state, s.seq),
            None => (MaterializedState::default(), 0),
        };

        let wal = Wal::open(wal_path, processed_seq)?;
        for entry in wal.entries_after(processed_seq)? {
            state.apply(&entry.event);
        }

        info!(processed_seq, "persistence opened, WAL replayed");

        Ok(Self {
            inner: Mutex::new(Inner {
                wal,
                state,
                last_snapshot_seq: processed_seq,
            }),
            snapshot_path: snapshot_path.to_owned(),
            sink: Mutex::new(None),
        })
    }

    /// Register a callback invoked with every event immediately after it is
    /// durably published, in publish order. Used to feed the broadcaster
    /// without this crate depending on it; at most one sink is kept, set
    /// once at daemon startup.
    pub fn set_sink(&self, sink: Arc<dyn Fn(&Event) + Send + Sync>) {
        *self.sink.lock() = Some(sink);
    }

    /// Append `event` to the WAL, fold it into the materialized state, and
    /// return its assigned sequence number. Failure to flush is the only
    /// error path here; the event's effect on in-memory state is already
    /// visible to concurrent readers by the time this returns.
    pub fn publish(&self, event: Event) -> Result<u64, PersistenceError> {
        let mut inner = self.inner.lock();
        let seq = inner.wal.append(&event)?;
        inner.wal.flush()?;
        inner.wal.mark_processed(seq);
        inner.state.apply(&event);
        drop(inner);
        self.maybe_snapshot()?;
        if let Some(sink) = self.sink.lock().as_ref() {
            sink(&event);
        }
        Ok(seq)
    }

    fn maybe_snapshot(&self) -> Result<(), PersistenceError> {
        let mut inner = self.inner.lock();
        let processed = inner.wal.processed_seq();
        if processed < inner.last_snapshot_seq + SNAPSHOT_INTERVAL {
            return Ok(());
        }
        let snapshot = Snapshot::new(processed, inner.state.clone());
        snapshot.save(&self.snapshot_path)?;
        inner.wal.truncate_before(processed)?;
        inner.last_snapshot_seq = processed;
        Ok(())
    }

    pub fn upsert_project(&self, project: Project) {
        self.inner.lock().state.upsert_project(project);
    }

    pub fn upsert_run(&self, run: PipelineRun) {
        self.inner.lock().state.upsert_run(run);
    }

    pub fn run(&self, run_id: &str) -> Option<PipelineRun> {
        self.inner.lock().state.run(run_id).cloned()
    }

    pub fn with_run_mut<R>(&self, run_id: &str, f: impl FnOnce(&mut PipelineRun) -> R) -> Option<R> {
        let mut inner = self.inner.lock();
        inner.state.run_mut(run_id).map(f)
    }

    pub fn push_step_snapshot(&self, run_id: &str, snapshot: StepSnapshot) {
        self.inner.lock().state.push_step_snapshot(run_id, snapshot);
    }

    pub fn upsert_step_result(&self, run_id: &str, result: StepResult) {
        self.inner.lock().state.upsert_step_result(run_id, result);
    }

    /// Append an activity record, rejecting a duplicate `event_id`. Returns
    /// `true` if the record was newly inserted.
    pub fn append_activity(&self, record: AIActivityRecord) -> bool {
        self.inner.lock().state.insert_activity(record)
    }

    pub fn activities_for_task(&self, task_id: &str) -> Vec<AIActivityRecord> {
        self.inner
            .lock()
            .state
            .activities_for_task(task_id)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn snapshot_state(&self) -> MaterializedState {
        self.inner.lock().state.clone()
    }
}

#[cfg(test)]
#[path = "persistence_tests.rs"]
mod tests;
