// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Programmable stand-in for the remote connector store.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream;
use tokio::sync::{Mutex, mpsc};

use chatwire_core::{
    ChatwireError, ConnectorRecord, ConnectorWatcher, WatchEvent, WatchEventStream,
};

/// A watcher whose list results and watch events are driven by the test.
pub struct MockWatcher {
    list: Arc<Mutex<Vec<ConnectorRecord>>>,
    list_failures: Arc<Mutex<u32>>,
    events_tx: mpsc::UnboundedSender<WatchEvent>,
    events_rx: Mutex<Option<mpsc::UnboundedReceiver<WatchEvent>>>,
}

impl MockWatcher {
    pub fn new() -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            list: Arc::new(Mutex::new(Vec::new())),
            list_failures: Arc::new(Mutex::new(0)),
            events_tx,
            events_rx: Mutex::new(Some(events_rx)),
        }
    }

    /// Replaces the snapshot returned by subsequent `list` calls.
    pub async fn set_list(&self, records: Vec<ConnectorRecord>) {
        *self.list.lock().await = records;
    }

    /// Makes the next `n` `list` calls fail.
    pub async fn fail_lists(&self, n: u32) {
        *self.list_failures.lock().await = n;
    }

    /// Pushes one event onto the watch stream.
    pub async fn push(&self, event: WatchEvent) {
        let _ = self.events_tx.send(event);
    }
}

impl Default for MockWatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConnectorWatcher for MockWatcher {
    async fn list(&self) -> Result<Vec<ConnectorRecord>, ChatwireError> {
        let mut failures = self.list_failures.lock().await;
        if *failures > 0 {
            *failures = failures.saturating_sub(1);
            return Err(ChatwireError::Watch {
                message: "mock list failure".into(),
                source: None,
            });
        }
        Ok(self.list.lock().await.clone())
    }

    async fn watch(&self) -> Result<WatchEventStream, ChatwireError> {
        match self.events_rx.lock().await.take() {
            Some(rx) => Ok(Box::pin(stream::unfold(rx, |mut rx| async move {
                rx.recv().await.map(|event| (event, rx))
            }))),
            // The single event stream was already consumed; later
            // subscriptions idle forever.
            None => Ok(Box::pin(stream::pending())),
        }
    }
}
