// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reconciler callback interface exposed to the host application.

use async_trait::async_trait;

use crate::error::ChatwireError;

/// Callbacks invoked by the reconciliation controller for observed
/// connector transitions.
///
/// Implementations must be idempotent: invoking `on_add` or `on_update`
/// twice with an identical (id, config) pair must not produce a different
/// externally observable effect than invoking it once. Errors trigger the
/// controller's requeue-with-backoff policy.
#[async_trait]
pub trait ConnectorHandler: Send + Sync {
    async fn on_add(&self, connector_id: &str, config: &str) -> Result<(), ChatwireError>;

    async fn on_update(&self, connector_id: &str, config: &str) -> Result<(), ChatwireError>;

    async fn on_delete(&self, connector_id: &str) -> Result<(), ChatwireError>;
}
