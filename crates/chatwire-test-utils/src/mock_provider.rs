// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock chat provider adapter for deterministic testing.
//!
//! Responses are popped from a FIFO queue; when the queue is empty, a
//! default "mock reply" text is returned. Calls, resets, and failure
//! injection are all observable from the test.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use chatwire_core::{ChatProvider, ChatwireError, ProviderKind};

/// A chat provider that returns pre-configured replies.
pub struct MockChatProvider {
    kind: ProviderKind,
    replies: Arc<Mutex<VecDeque<String>>>,
    calls: Arc<Mutex<Vec<(String, String)>>>,
    fail_next: AtomicU32,
    reset_count: AtomicU32,
}

impl MockChatProvider {
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            replies: Arc::new(Mutex::new(VecDeque::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_next: AtomicU32::new(0),
            reset_count: AtomicU32::new(0),
        }
    }

    /// Pre-loads replies returned in order.
    pub fn with_replies(kind: ProviderKind, replies: Vec<String>) -> Self {
        let provider = Self::new(kind);
        *provider.replies.try_lock().expect("fresh mutex") = VecDeque::from(replies);
        provider
    }

    /// Queues a reply.
    pub async fn add_reply(&self, reply: impl Into<String>) {
        self.replies.lock().await.push_back(reply.into());
    }

    /// Makes the next `n` completion calls fail.
    pub fn fail_next(&self, n: u32) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    /// The (user, content) pairs observed so far.
    pub async fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }

    /// How many times `reset` has run.
    pub fn reset_count(&self) -> u32 {
        self.reset_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatProvider for MockChatProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn send_completion(
        &self,
        user: &str,
        content: &str,
    ) -> Result<String, ChatwireError> {
        self.calls
            .lock()
            .await
            .push((user.to_string(), content.to_string()));

        let failures = self.fail_next.load(Ordering::SeqCst);
        if failures > 0 {
            self.fail_next.store(failures - 1, Ordering::SeqCst);
            return Err(ChatwireError::Provider {
                message: "mock provider failure".into(),
                source: None,
            });
        }

        Ok(self
            .replies
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| "mock reply".to_string()))
    }

    async fn reset(&self) {
        self.reset_count.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replies_returned_in_order_then_default() {
        let provider = MockChatProvider::with_replies(
            ProviderKind::ChatGpt,
            vec!["first".into(), "second".into()],
        );
        assert_eq!(provider.send_completion("u", "q").await.unwrap(), "first");
        assert_eq!(provider.send_completion("u", "q").await.unwrap(), "second");
        assert_eq!(provider.send_completion("u", "q").await.unwrap(), "mock reply");
        assert_eq!(provider.call_count().await, 3);
    }

    #[tokio::test]
    async fn injected_failures_are_consumed() {
        let provider = MockChatProvider::new(ProviderKind::ErnieBot);
        provider.fail_next(1);
        assert!(provider.send_completion("u", "q").await.is_err());
        assert!(provider.send_completion("u", "q").await.is_ok());
    }
}
