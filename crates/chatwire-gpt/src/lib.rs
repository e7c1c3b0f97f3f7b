// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! GPT provider adapter.
//!
//! Estimates incoming tokens as `content.len() / 4`, trims the user's
//! retained history to the configured budget before each call, and records
//! the exchange with the usage figures the API reports.

pub mod client;
pub mod types;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use chatwire_context::ContextStore;
use chatwire_core::{ChatProvider, ChatTurn, ChatwireError, ProviderKind};

use crate::client::GptClient;
use crate::types::ChatCompletionRequest;

const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Token estimate for outgoing content: roughly four bytes per token.
fn estimate_tokens(content: &str) -> u64 {
    (content.len() / 4) as u64
}

/// GPT-backed [`ChatProvider`] with an optional per-user context window.
pub struct GptProvider {
    client: GptClient,
    context: Arc<ContextStore>,
    max_tokens: u64,
    enable_context: bool,
}

impl GptProvider {
    pub fn new(token: String, max_tokens: u64, enable_context: bool) -> Result<Self, ChatwireError> {
        Ok(Self {
            client: GptClient::new(&token)?,
            context: Arc::new(ContextStore::new()),
            max_tokens,
            enable_context,
        })
    }

    #[cfg(test)]
    fn with_base_url(mut self, url: String) -> Self {
        self.client = self.client.with_base_url(url);
        self
    }

    async fn complete_with_context(
        &self,
        user: &str,
        content: &str,
    ) -> Result<String, ChatwireError> {
        let entry = self.context.user(user);

        // Trim and snapshot under the user's lock, then release it for the
        // network call so other users (and this user's rollover) are never
        // blocked on I/O.
        let messages = {
            let mut ctx = entry.lock().await;
            ctx.reserve(estimate_tokens(content), self.max_tokens);
            let mut messages = ctx.turns().to_vec();
            messages.push(ChatTurn::user(content));
            messages
        };

        let request = ChatCompletionRequest {
            model: DEFAULT_MODEL.to_string(),
            messages,
        };
        let response = self.client.complete(&request).await?;
        let reply = response.first_content().to_string();

        if !reply.is_empty() {
            let mut ctx = entry.lock().await;
            ctx.record_exchange(content, &reply, &response.usage);
            debug!(user, total_tokens = ctx.total_tokens(), "recorded exchange");
        }
        Ok(reply)
    }

    async fn complete_stateless(&self, content: &str) -> Result<String, ChatwireError> {
        let request = ChatCompletionRequest {
            model: DEFAULT_MODEL.to_string(),
            messages: vec![ChatTurn::user(content)],
        };
        let response = self.client.complete(&request).await?;
        Ok(response.first_content().to_string())
    }
}

#[async_trait]
impl ChatProvider for GptProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::ChatGpt
    }

    async fn send_completion(&self, user: &str, content: &str) -> Result<String, ChatwireError> {
        if self.enable_context {
            self.complete_with_context(user, content).await
        } else {
            self.complete_stateless(content).await
        }
    }

    async fn reset(&self) {
        self.context.reset();
    }
}
