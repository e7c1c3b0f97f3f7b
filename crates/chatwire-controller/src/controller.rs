// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The reconciliation controller: filters cache notifications into three
//! deduplicating retry queues and drains them with small worker pools.
//!
//! Per-key ordering is not promised across queues; handlers must be
//! idempotent and tolerate out-of-order add/update/delete for the same
//! connector. A single item's permanent failure never stops a worker loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use chatwire_core::{ChatwireError, ConnectorHandler, ConnectorRecord, ReconcileKey};

use crate::cache::{CacheEvent, WatchCache};
use crate::filter::ConnectorFilter;
use crate::queue::WorkQueue;

/// Controller tuning knobs.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Workers draining each of the three queues.
    pub workers_per_queue: usize,
    /// How long to wait for the initial cache sync before failing startup.
    pub sync_timeout: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            workers_per_queue: 1,
            sync_timeout: Duration::from_secs(30),
        }
    }
}

impl From<&chatwire_config::ControllerSection> for ControllerConfig {
    fn from(section: &chatwire_config::ControllerSection) -> Self {
        Self {
            workers_per_queue: section.workers_per_queue,
            sync_timeout: section.sync_timeout(),
        }
    }
}

/// Level-triggered reconciliation controller over connector resources.
pub struct Controller {
    cache: Arc<WatchCache>,
    events: mpsc::Receiver<CacheEvent>,
    filter: ConnectorFilter,
    handler: Arc<dyn ConnectorHandler>,
    add_queue: Arc<WorkQueue<ReconcileKey>>,
    update_queue: Arc<WorkQueue<ReconcileKey>>,
    delete_queue: Arc<WorkQueue<ConnectorRecord>>,
    config: ControllerConfig,
}

impl Controller {
    pub fn new(
        cache: Arc<WatchCache>,
        events: mpsc::Receiver<CacheEvent>,
        filter: ConnectorFilter,
        handler: Arc<dyn ConnectorHandler>,
        config: ControllerConfig,
    ) -> Self {
        Self {
            cache,
            events,
            filter,
            handler,
            add_queue: WorkQueue::new("add-connector"),
            update_queue: WorkQueue::new("update-connector"),
            delete_queue: WorkQueue::new("delete-connector"),
            config,
        }
    }

    /// Runs the controller until `shutdown` is cancelled.
    ///
    /// Blocks until the initial cache sync completes; a sync timeout is a
    /// startup error and no workers are started. On shutdown every queue is
    /// shut down so blocked dequeues return and workers exit their loops.
    pub async fn run(mut self, shutdown: CancellationToken) -> Result<(), ChatwireError> {
        info!("starting controller, waiting for cache sync");
        self.cache.wait_for_sync(self.config.sync_timeout).await?;

        info!(workers = self.config.workers_per_queue, "starting workers");
        let mut workers: Vec<JoinHandle<()>> = Vec::new();
        for _ in 0..self.config.workers_per_queue.max(1) {
            workers.push(tokio::spawn(run_add_worker(
                Arc::clone(&self.cache),
                Arc::clone(&self.add_queue),
                Arc::clone(&self.handler),
            )));
            workers.push(tokio::spawn(run_update_worker(
                Arc::clone(&self.cache),
                Arc::clone(&self.update_queue),
                Arc::clone(&self.handler),
            )));
            workers.push(tokio::spawn(run_delete_worker(
                Arc::clone(&self.delete_queue),
                Arc::clone(&self.handler),
            )));
        }

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                event = self.events.recv() => {
                    match event {
                        Some(event) => self.enqueue(event).await,
                        None => {
                            warn!("cache event channel closed");
                            break;
                        }
                    }
                }
            }
        }

        info!("shutting down controller queues");
        self.add_queue.shut_down().await;
        self.update_queue.shut_down().await;
        self.delete_queue.shut_down().await;
        for worker in workers {
            let _ = worker.await;
        }
        Ok(())
    }

    /// Applies the filter to one cache notification and routes it.
    ///
    /// Updates re-evaluate the predicate against both states: a record
    /// entering the matched set is an add, one leaving it is a delete
    /// carrying the old snapshot.
    async fn enqueue(&self, event: CacheEvent) {
        match event {
            CacheEvent::Added(record) => {
                if self.filter.matches(&record) {
                    debug!(key = %record.key(), "enqueue add connector");
                    self.add_queue.add(record.key()).await;
                }
            }
            CacheEvent::Updated { old, new } => {
                match (self.filter.matches(&old), self.filter.matches(&new)) {
                    (false, true) => {
                        debug!(key = %new.key(), "enqueue add connector (entered filter)");
                        self.add_queue.add(new.key()).await;
                    }
                    (true, true) => {
                        debug!(key = %new.key(), "enqueue update connector");
                        self.update_queue.add(new.key()).await;
                    }
                    (true, false) => {
                        debug!(key = %old.key(), "enqueue delete connector (left filter)");
                        self.delete_queue.add(old).await;
                    }
                    (false, false) => {}
                }
            }
            CacheEvent::Deleted(record) => {
                if self.filter.matches(&record) {
                    debug!(key = %record.key(), "enqueue delete connector");
                    self.delete_queue.add(record).await;
                }
            }
        }
    }
}

async fn run_add_worker(
    cache: Arc<WatchCache>,
    queue: Arc<WorkQueue<ReconcileKey>>,
    handler: Arc<dyn ConnectorHandler>,
) {
    while let Some(key) = queue.get().await {
        process_keyed(&cache, &queue, &*handler, key, Op::Add).await;
    }
}

async fn run_update_worker(
    cache: Arc<WatchCache>,
    queue: Arc<WorkQueue<ReconcileKey>>,
    handler: Arc<dyn ConnectorHandler>,
) {
    while let Some(key) = queue.get().await {
        process_keyed(&cache, &queue, &*handler, key, Op::Update).await;
    }
}

async fn run_delete_worker(
    queue: Arc<WorkQueue<ConnectorRecord>>,
    handler: Arc<dyn ConnectorHandler>,
) {
    while let Some(record) = queue.get().await {
        debug!(key = %record.key(), "handle delete connector");
        match handler.on_delete(&record.connector_id).await {
            Ok(()) => {
                queue.forget(&record).await;
                queue.done(&record).await;
            }
            Err(err) => {
                warn!(key = %record.key(), error = %err, "delete handler failed, requeueing");
                queue.done(&record).await;
                queue.add_rate_limited(record).await;
            }
        }
    }
}

#[derive(Clone, Copy)]
enum Op {
    Add,
    Update,
}

/// Shared add/update processing: resolve the key against the cache and
/// invoke the matching callback. A key that has vanished is already
/// resolved, not an error.
async fn process_keyed(
    cache: &Arc<WatchCache>,
    queue: &Arc<WorkQueue<ReconcileKey>>,
    handler: &dyn ConnectorHandler,
    key: ReconcileKey,
    op: Op,
) {
    let Some(record) = cache.get(&key).await else {
        debug!(key = %key, "connector gone before processing, dropping item");
        queue.forget(&key).await;
        queue.done(&key).await;
        return;
    };

    let result = match op {
        Op::Add => {
            debug!(key = %key, "handle add connector");
            handler.on_add(&record.connector_id, &record.config).await
        }
        Op::Update => {
            debug!(key = %key, "handle update connector");
            handler.on_update(&record.connector_id, &record.config).await
        }
    };

    match result {
        Ok(()) => {
            queue.forget(&key).await;
            queue.done(&key).await;
        }
        Err(err) => {
            warn!(key = %key, error = %err, "handler failed, requeueing");
            queue.done(&key).await;
            queue.add_rate_limited(key).await;
        }
    }
}
