// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory event sink collecting published envelopes.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use chatwire_core::{ChatwireError, EventEnvelope, EventSink};

/// An [`EventSink`] that stores every published envelope for inspection.
#[derive(Default)]
pub struct MemorySink {
    events: Arc<Mutex<Vec<EventEnvelope>>>,
    fail: AtomicBool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent publishes fail.
    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }

    pub async fn events(&self) -> Vec<EventEnvelope> {
        self.events.lock().await.clone()
    }

    pub async fn event_count(&self) -> usize {
        self.events.lock().await.len()
    }
}

#[async_trait]
impl EventSink for MemorySink {
    async fn publish(&self, event: EventEnvelope) -> Result<(), ChatwireError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ChatwireError::Publish {
                message: "memory sink configured to fail".into(),
                source: None,
            });
        }
        self.events.lock().await.push(event);
        Ok(())
    }
}
