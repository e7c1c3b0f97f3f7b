// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound event publishing interface.

use async_trait::async_trait;

use crate::error::ChatwireError;
use crate::types::EventEnvelope;

/// Destination for completion-result events.
///
/// Delivery and acknowledgement semantics are owned by the implementation;
/// the completion path only builds envelopes and hands them over.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn publish(&self, event: EventEnvelope) -> Result<(), ChatwireError>;
}
