// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recording reconciler-callback fixture with failure injection.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use chatwire_core::{ChatwireError, ConnectorHandler};

/// One observed callback invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerCall {
    Add { connector_id: String, config: String },
    Update { connector_id: String, config: String },
    Delete { connector_id: String },
}

/// A [`ConnectorHandler`] that records every invocation and can be told to
/// fail the first `n` calls for a given connector id.
#[derive(Default)]
pub struct RecordingHandler {
    calls: Arc<Mutex<Vec<HandlerCall>>>,
    failures: Arc<Mutex<HashMap<String, u32>>>,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails the next `n` callbacks (of any kind) for `connector_id`.
    pub async fn fail_times(&self, connector_id: &str, n: u32) {
        self.failures.lock().await.insert(connector_id.to_string(), n);
    }

    pub async fn calls(&self) -> Vec<HandlerCall> {
        self.calls.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }

    async fn check_failure(&self, connector_id: &str) -> Result<(), ChatwireError> {
        let mut failures = self.failures.lock().await;
        match failures.get_mut(connector_id) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                Err(ChatwireError::Internal(format!(
                    "injected failure for {connector_id}"
                )))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl ConnectorHandler for RecordingHandler {
    async fn on_add(&self, connector_id: &str, config: &str) -> Result<(), ChatwireError> {
        self.calls.lock().await.push(HandlerCall::Add {
            connector_id: connector_id.to_string(),
            config: config.to_string(),
        });
        self.check_failure(connector_id).await
    }

    async fn on_update(&self, connector_id: &str, config: &str) -> Result<(), ChatwireError> {
        self.calls.lock().await.push(HandlerCall::Update {
            connector_id: connector_id.to_string(),
            config: config.to_string(),
        });
        self.check_failure(connector_id).await
    }

    async fn on_delete(&self, connector_id: &str) -> Result<(), ChatwireError> {
        self.calls.lock().await.push(HandlerCall::Delete {
            connector_id: connector_id.to_string(),
        });
        self.check_failure(connector_id).await
    }
}
