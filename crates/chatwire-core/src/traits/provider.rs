// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider adapter trait for chat-completion API integrations.

use async_trait::async_trait;

use crate::error::ChatwireError;
use crate::types::ProviderKind;

/// Adapter over a single external chat-completion API.
///
/// Each adapter owns its own per-user context store; implementations differ
/// only in wire format, authentication, and token accounting.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Which provider variant this adapter speaks for.
    fn kind(&self) -> ProviderKind;

    /// Sends a completion request for one user turn.
    ///
    /// Returns the completion content, which may be empty when the remote
    /// API answered successfully but produced no text.
    async fn send_completion(&self, user: &str, content: &str)
        -> Result<String, ChatwireError>;

    /// Atomically clears all retained per-user conversation history.
    async fn reset(&self);
}
