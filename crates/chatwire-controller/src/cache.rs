// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Local mirror of the remote connector collection.
//!
//! The cache is populated by an initial full list, then kept consistent by
//! the long-lived watch subscription plus a periodic full resync that
//! reconciles any missed deliveries. Reads may lag the remote store but
//! never fabricate entries. Writes happen only on the pump task.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::{RwLock, mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use chatwire_core::{
    ChatwireError, ConnectorRecord, ConnectorWatcher, ReconcileKey, WatchEvent,
};

/// Delay between initial-list retries while the cache is not yet synced.
const LIST_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Capacity of the subscriber channel.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// A transition observed on the local mirror, delivered to the subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
    Added(ConnectorRecord),
    Updated {
        old: ConnectorRecord,
        new: ConnectorRecord,
    },
    Deleted(ConnectorRecord),
}

/// Eventually-consistent local view of the remote connector collection.
pub struct WatchCache {
    watcher: Arc<dyn ConnectorWatcher>,
    store: RwLock<HashMap<ReconcileKey, ConnectorRecord>>,
    synced_tx: watch::Sender<bool>,
    events_tx: mpsc::Sender<CacheEvent>,
    resync_interval: Duration,
}

impl WatchCache {
    /// Creates a cache over `watcher` and returns it with the subscriber
    /// side of its event channel.
    pub fn new(
        watcher: Arc<dyn ConnectorWatcher>,
        resync_interval: Duration,
    ) -> (Arc<Self>, mpsc::Receiver<CacheEvent>) {
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (synced_tx, _) = watch::channel(false);
        let cache = Arc::new(Self {
            watcher,
            store: RwLock::new(HashMap::new()),
            synced_tx,
            events_tx,
            resync_interval,
        });
        (cache, events_rx)
    }

    /// Looks up the last-observed record for `key`.
    pub async fn get(&self, key: &ReconcileKey) -> Option<ConnectorRecord> {
        self.store.read().await.get(key).cloned()
    }

    /// Whether the initial full sync has completed.
    pub fn has_synced(&self) -> bool {
        *self.synced_tx.borrow()
    }

    /// Blocks until the initial full sync completes.
    ///
    /// A timeout is a startup error for the controller, not a process
    /// abort.
    pub async fn wait_for_sync(&self, timeout: Duration) -> Result<(), ChatwireError> {
        let mut synced = self.synced_tx.subscribe();
        let wait = async {
            while !*synced.borrow_and_update() {
                if synced.changed().await.is_err() {
                    return Err(ChatwireError::Startup(
                        "watch cache stopped before initial sync".into(),
                    ));
                }
            }
            Ok(())
        };
        tokio::time::timeout(timeout, wait)
            .await
            .map_err(|_| ChatwireError::Startup("initial cache sync timed out".into()))?
    }

    /// Runs the pump until cancelled: initial list, then watch events
    /// interleaved with periodic full resyncs.
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        if !self.initial_sync(&shutdown).await {
            return;
        }

        let mut resync = tokio::time::interval(self.resync_interval);
        resync.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        resync.reset();

        loop {
            let mut stream = match self.watcher.watch().await {
                Ok(stream) => stream,
                Err(err) => {
                    warn!(error = %err, "watch subscription failed, retrying");
                    tokio::select! {
                        _ = shutdown.cancelled() => return,
                        _ = tokio::time::sleep(LIST_RETRY_DELAY) => continue,
                    }
                }
            };
            debug!("watch subscription established");

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => return,
                    _ = resync.tick() => {
                        if let Err(err) = self.resync().await {
                            warn!(error = %err, "periodic resync failed");
                        }
                    }
                    event = stream.next() => {
                        match event {
                            Some(event) => self.apply(event).await,
                            None => {
                                warn!("watch subscription closed, re-establishing");
                                break;
                            }
                        }
                    }
                }
            }
        }
    }

    /// Populates the store from a full list, retrying until it succeeds or
    /// shutdown is requested. Returns false when cancelled first.
    async fn initial_sync(&self, shutdown: &CancellationToken) -> bool {
        loop {
            match self.watcher.list().await {
                Ok(records) => {
                    let count = records.len();
                    {
                        let mut store = self.store.write().await;
                        for record in &records {
                            store.insert(record.key(), record.clone());
                        }
                    }
                    // Signal sync before emitting: the subscriber only
                    // starts draining once `wait_for_sync` returns, and the
                    // initial adds can exceed the channel capacity.
                    self.synced_tx.send_replace(true);
                    info!(connectors = count, "initial cache sync complete");
                    for record in records {
                        self.emit(CacheEvent::Added(record)).await;
                    }
                    return true;
                }
                Err(err) => {
                    warn!(error = %err, "initial list failed, retrying");
                    tokio::select! {
                        _ = shutdown.cancelled() => return false,
                        _ = tokio::time::sleep(LIST_RETRY_DELAY) => {}
                    }
                }
            }
        }
    }

    /// Applies one raw watch event to the local mirror.
    async fn apply(&self, event: WatchEvent) {
        match event {
            WatchEvent::Added(record) | WatchEvent::Modified(record) => {
                let previous = {
                    let mut store = self.store.write().await;
                    store.insert(record.key(), record.clone())
                };
                match previous {
                    None => self.emit(CacheEvent::Added(record)).await,
                    Some(old) if old != record => {
                        self.emit(CacheEvent::Updated { old, new: record }).await;
                    }
                    // Duplicate delivery of an unchanged record.
                    Some(_) => {}
                }
            }
            WatchEvent::Deleted(record) => {
                let removed = self.store.write().await.remove(&record.key());
                if removed.is_some() {
                    self.emit(CacheEvent::Deleted(record)).await;
                }
            }
        }
    }

    /// Reconciles the mirror against a fresh full list, synthesizing the
    /// transitions the watch stream missed.
    async fn resync(&self) -> Result<(), ChatwireError> {
        let records = self.watcher.list().await?;
        debug!(connectors = records.len(), "running full resync");

        let fresh: HashMap<ReconcileKey, ConnectorRecord> =
            records.into_iter().map(|r| (r.key(), r)).collect();

        let mut events = Vec::new();
        {
            let mut store = self.store.write().await;
            for (key, record) in &fresh {
                match store.get(key) {
                    None => events.push(CacheEvent::Added(record.clone())),
                    Some(old) if old != record => events.push(CacheEvent::Updated {
                        old: old.clone(),
                        new: record.clone(),
                    }),
                    Some(_) => {}
                }
            }
            store.retain(|key, old| {
                if fresh.contains_key(key) {
                    true
                } else {
                    events.push(CacheEvent::Deleted(old.clone()));
                    false
                }
            });
            for event in &events {
                if let CacheEvent::Added(record) | CacheEvent::Updated { new: record, .. } =
                    event
                {
                    store.insert(record.key(), record.clone());
                }
            }
        }

        for event in events {
            self.emit(event).await;
        }
        Ok(())
    }

    async fn emit(&self, event: CacheEvent) {
        if self.events_tx.send(event).await.is_err() {
            debug!("cache subscriber dropped, event discarded");
        }
    }
}
