// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The event broadcaster: a single process-wide fan-out point. Every
//! workflow publishes through `Persistence::publish`; the broadcaster is
//! handed each event afterward and pushes it to every subscriber whose
//! filter matches.
//!
//! Delivery is best-effort and non-blocking: a full subscriber queue drops
//! its oldest entry rather than back-pressuring the publisher, mirroring
//! the wake-without-blocking shape of the WAL's single-reader notify.

use noldarim_core::{Event, EventFilter};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Notify;

/// Bound on a subscriber's outbound queue. Overflow drops the oldest entry.
const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Sliding-window dedup cache TTL, per spec's "TTL >= 10 min" requirement.
const DEDUP_TTL: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct SubscriberId(u64);

struct DedupCache {
    seen: HashMap<String, Instant>,
}

impl DedupCache {
    fn new() -> Self {
        Self { seen: HashMap::new() }
    }

    /// `true` if `key` was already seen within the TTL window (and should be
    /// dropped). Also prunes expired entries opportunistically.
    fn check_and_insert(&mut self, key: &str, now: Instant) -> bool {
        self.seen.retain(|_, seen_at| now.duration_since(*seen_at) < DEDUP_TTL);
        if self.seen.contains_key(key) {
            return true;
        }
        self.seen.insert(key.to_string(), now);
        false
    }
}

struct SubscriberQueue {
    filter: EventFilter,
    queue: Mutex<VecDeque<Event>>,
    dedup: Mutex<DedupCache>,
    notify: Notify,
    dropped: AtomicU64,
    dropped_duplicates: AtomicU64,
    closed: AtomicBool,
    capacity: usize,
}

impl SubscriberQueue {
    /// Enqueue `event`, applying dedup (bypassed for critical errors) and
    /// drop-oldest overflow handling. Marks the queue closed-after-drain
    /// when a critical error is enqueued.
    fn push(&self, event: Event, now: Instant) {
        if self.closed.load(Ordering::Acquire) {
            return;
        }
        if !event.is_critical() {
            let key = event.metadata().idempotency_key.clone();
            if self.dedup.lock().check_and_insert(&key, now) {
                self.dropped_duplicates.fetch_add(1, Ordering::Relaxed);
                return;
            }
        }

        let mut queue = self.queue.lock();
        if queue.len() >= self.capacity {
            queue.pop_front();
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        let is_critical = event.is_critical();
        queue.push_back(event);
        if is_critical {
            // The subscriber still drains this final event; closing here
            // only prevents further pushes.
            self.closed.store(true, Ordering::Release);
        }
        drop(queue);
        self.notify.notify_one();
    }

    fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn dropped_duplicates_count(&self) -> u64 {
        self.dropped_duplicates.load(Ordering::Relaxed)
    }
}

/// A live subscription handle: call `recv` in a loop to drain matching
/// events in ingest order. Returns `None` once the subscriber has been
/// terminated (disconnected, or a `CriticalError` has been delivered).
pub struct Subscription {
    id: SubscriberId,
    queue: Arc<SubscriberQueue>,
    broadcaster: Arc<Inner>,
    terminated: bool,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    pub fn dropped_count(&self) -> u64 {
        self.queue.dropped_count()
    }

    /// Count of events suppressed by idempotency-key dedup within the TTL
    /// window, distinct from `dropped_count`'s overflow drops.
    pub fn dropped_duplicates_count(&self) -> u64 {
        self.queue.dropped_duplicates_count()
    }

    /// Wait for and return the next matching event. `None` means the
    /// subscriber is done: either it was explicitly unsubscribed, or the
    /// last event delivered was a `CriticalError`.
    pub async fn recv(&mut self) -> Option<Event> {
        if self.terminated {
            return None;
        }
        loop {
            {
                let mut queue = self.queue.queue.lock();
                if let Some(event) = queue.pop_front() {
                    drop(queue);
                    if event.is_critical() {
                        self.terminated = true;
                    }
                    return Some(event);
                }
            }
            if self.queue.closed.load(Ordering::Acquire) {
                return None;
            }
            self.queue.notify.notified().await;
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.broadcaster.remove(self.id);
    }
}

struct Inner {
    subscribers: Mutex<HashMap<SubscriberId, Arc<SubscriberQueue>>>,
    next_id: AtomicU64,
}

impl Inner {
    fn remove(&self, id: SubscriberId) {
        self.subscribers.lock().remove(&id);
    }
}

/// Process-wide fan-out point. Cheap to clone: internally an `Arc`.
#[derive(Clone)]
pub struct Broadcaster {
    inner: Arc<Inner>,
    queue_capacity: usize,
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}

impl Broadcaster {
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                subscribers: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
            }),
            queue_capacity,
        }
    }

    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        let id = SubscriberId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let queue = Arc::new(SubscriberQueue {
            filter,
            queue: Mutex::new(VecDeque::new()),
            dedup: Mutex::new(DedupCache::new()),
            notify: Notify::new(),
            dropped: AtomicU64::new(0),
            dropped_duplicates: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            capacity: self.queue_capacity,
        });
        self.inner.subscribers.lock().insert(id, queue.clone());
        Subscription { id, queue, broadcaster: self.inner.clone(), terminated: false }
    }

    /// Fan `event` out to every subscriber whose filter matches. Write
    /// failures (a subscriber dropping its receiver) are handled by
    /// `Subscription::drop` deregistering the subscriber; this call never
    /// blocks on a slow subscriber.
    pub fn publish(&self, event: Event) {
        let now = Instant::now();
        let subscribers: Vec<Arc<SubscriberQueue>> = self.inner.subscribers.lock().values().cloned().collect();
        for sub in subscribers {
            if event.is_critical() || sub.filter.matches(&event) {
                sub.push(event.clone(), now);
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.lock().len()
    }
}

#[cfg(test)]
#[path = "broadcaster_tests.rs"]
mod tests;
