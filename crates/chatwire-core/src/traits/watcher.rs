// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Subscription interface to the remote connector-resource store.

use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;

use crate::error::ChatwireError;
use crate::types::ConnectorRecord;

/// A raw transition observed on the remote collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    Added(ConnectorRecord),
    Modified(ConnectorRecord),
    Deleted(ConnectorRecord),
}

/// Stream of raw watch events from the remote store.
pub type WatchEventStream = Pin<Box<dyn Stream<Item = WatchEvent> + Send>>;

/// Read access to the remote connector collection.
///
/// The watch cache consumes this to maintain its local mirror: `list` for
/// the initial sync and periodic resync, `watch` for the long-lived push
/// subscription. Duplicate or missed deliveries are tolerated downstream
/// by queue deduplication and idempotent handlers.
#[async_trait]
pub trait ConnectorWatcher: Send + Sync + 'static {
    /// Returns a full snapshot of the remote collection.
    async fn list(&self) -> Result<Vec<ConnectorRecord>, ChatwireError>;

    /// Opens a long-lived subscription yielding transitions as they occur.
    async fn watch(&self) -> Result<WatchEventStream, ChatwireError>;
}
