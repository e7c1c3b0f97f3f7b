// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deduplicating, rate-limited work queue.
//!
//! Re-enqueues of an item that is already waiting coalesce into one pending
//! entry (at-least-once, not at-most-once). An item re-added while a worker
//! is processing it is marked dirty and requeued when the worker calls
//! [`WorkQueue::done`]. Failed items come back through
//! [`WorkQueue::add_rate_limited`] with per-item exponential backoff.

use std::collections::{HashMap, HashSet, VecDeque};
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Notify};
use tracing::debug;

/// Default per-item backoff: 5ms doubling up to 1000s.
const BASE_DELAY: Duration = Duration::from_millis(5);
const MAX_DELAY: Duration = Duration::from_secs(1000);

#[derive(Debug)]
struct QueueState<T> {
    queue: VecDeque<T>,
    /// Items waiting to be processed (queued) or re-added while processing.
    dirty: HashSet<T>,
    processing: HashSet<T>,
    failures: HashMap<T, u32>,
    shutting_down: bool,
}

/// A deduplicating retry queue drained by a small worker pool.
#[derive(Debug)]
pub struct WorkQueue<T> {
    name: String,
    state: Mutex<QueueState<T>>,
    notify: Notify,
    base_delay: Duration,
    max_delay: Duration,
}

impl<T> WorkQueue<T>
where
    T: Clone + Eq + Hash + Send + Sync + 'static,
{
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Self::with_backoff(name, BASE_DELAY, MAX_DELAY)
    }

    pub fn with_backoff(
        name: impl Into<String>,
        base_delay: Duration,
        max_delay: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            state: Mutex::new(QueueState {
                queue: VecDeque::new(),
                dirty: HashSet::new(),
                processing: HashSet::new(),
                failures: HashMap::new(),
                shutting_down: false,
            }),
            notify: Notify::new(),
            base_delay,
            max_delay,
        })
    }

    /// Enqueues `item`, coalescing with any already-pending copy.
    pub async fn add(&self, item: T) {
        let mut state = self.state.lock().await;
        if state.shutting_down {
            return;
        }
        if !state.dirty.insert(item.clone()) {
            // Already waiting; nothing to do.
            return;
        }
        if state.processing.contains(&item) {
            // Requeued by `done` once the in-flight processing finishes.
            return;
        }
        state.queue.push_back(item);
        drop(state);
        self.notify.notify_one();
    }

    /// Re-enqueues a failed item after its exponential backoff delay.
    pub async fn add_rate_limited(self: &Arc<Self>, item: T) {
        let delay = {
            let mut state = self.state.lock().await;
            if state.shutting_down {
                return;
            }
            let failures = state.failures.entry(item.clone()).or_insert(0);
            *failures += 1;
            backoff_delay(self.base_delay, self.max_delay, *failures)
        };
        debug!(queue = %self.name, ?delay, "requeueing item after backoff");

        let queue = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            queue.add(item).await;
        });
    }

    /// Dequeues the next item, blocking until one is available.
    ///
    /// Returns `None` once the queue has been shut down and a worker should
    /// exit its loop.
    pub async fn get(&self) -> Option<T> {
        loop {
            let notified = self.notify.notified();
            {
                let mut state = self.state.lock().await;
                if let Some(item) = state.queue.pop_front() {
                    state.dirty.remove(&item);
                    state.processing.insert(item.clone());
                    if !state.queue.is_empty() {
                        self.notify.notify_one();
                    }
                    return Some(item);
                }
                if state.shutting_down {
                    return None;
                }
            }
            notified.await;
        }
    }

    /// Marks an item's processing finished, requeueing it if it went dirty
    /// while in flight.
    pub async fn done(&self, item: &T) {
        let mut state = self.state.lock().await;
        state.processing.remove(item);
        if state.dirty.contains(item) && !state.shutting_down {
            state.queue.push_back(item.clone());
            drop(state);
            self.notify.notify_one();
        }
    }

    /// Clears an item's backoff state after successful processing.
    pub async fn forget(&self, item: &T) {
        self.state.lock().await.failures.remove(item);
    }

    /// Transitions the queue to draining: blocked `get` calls return `None`
    /// once the backlog is empty, and new adds are dropped.
    pub async fn shut_down(&self) {
        let mut state = self.state.lock().await;
        state.shutting_down = true;
        drop(state);
        self.notify.notify_waiters();
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.state.lock().await.queue.len()
    }
}

fn backoff_delay(base: Duration, max: Duration, failures: u32) -> Duration {
    let shift = failures.saturating_sub(1).min(63);
    base.saturating_mul(1u32.checked_shl(shift).unwrap_or(u32::MAX))
        .min(max)
}
