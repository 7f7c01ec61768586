// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cancellation signaling for pipeline, step and observability workflows.
//!
//! A workflow only notices cancellation at the suspension points the
//! concurrency model allows: activity returns, timers, and signal waits.
//! `CancellationToken` is the signal; `Cancellable::race` is how a workflow
//! actually suspends on it without polling.

use crate::error::EngineError;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// A cooperative cancellation signal shared between a workflow and whatever
/// is asked to cancel it (a parent workflow, an external API call).
///
/// Cloning shares the same underlying flag: every clone observes the same
/// cancellation. There is no `tokio-util::CancellationToken` dependency here
/// on purpose — the flag-plus-notify shape below is the entire primitive
/// this engine needs.
#[derive(Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Signal cancellation. Idempotent: cancelling an already-cancelled
    /// token is a no-op beyond waking any current waiters.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once `cancel()` has been called. Resolves immediately if it
    /// already has been.
    pub async fn cancelled(&self) {
        if self.is_cancelled() {
            return;
        }
        let notified = self.notify.notified();
        if self.is_cancelled() {
            return;
        }
        notified.await;
    }

    /// Checks the flag and returns `Err(EngineError::Cancelled)` if set,
    /// the shape every activity return is funneled through per the
    /// suspension-point contract.
    pub fn check(&self) -> Result<(), EngineError> {
        if self.is_cancelled() {
            Err(EngineError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Race `fut` against cancellation. Returns the future's output if it
    /// finishes first, or `Err(EngineError::Cancelled)` if the token fires
    /// first.
    pub async fn race<F, T>(&self, fut: F) -> Result<T, EngineError>
    where
        F: Future<Output = T>,
    {
        tokio::select! {
            biased;
            () = self.cancelled() => Err(EngineError::Cancelled),
            out = fut => Ok(out),
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "cancellation_tests.rs"]
mod tests;
