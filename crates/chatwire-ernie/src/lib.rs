// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ernie provider adapter.
//!
//! Authenticates with an exchanged access token carried as a query
//! parameter, estimates incoming tokens as the byte length of the content,
//! and trims the per-user history against a fixed 1500-token window that
//! the upstream model imposes regardless of the configured budget.

pub mod oauth;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use chatwire_context::ContextStore;
use chatwire_core::{ChatProvider, ChatTurn, ChatwireError, ProviderKind};

use crate::oauth::TokenSource;
use crate::types::{ErnieRequest, ErnieResponse};

const API_BASE_URL: &str =
    "https://aip.baidubce.com/rpc/2.0/ai_custom/v1/wenxinworkshop/chat/completions";

/// Upstream context ceiling; tighter configured budgets are not honored by
/// the model so the window is pinned here.
const CONTEXT_BUDGET: u64 = 1500;

/// Byte-length token estimate for outgoing content.
fn estimate_tokens(content: &str) -> u64 {
    content.len() as u64
}

/// Ernie-backed [`ChatProvider`] with an optional per-user context window.
pub struct ErnieProvider {
    client: reqwest::Client,
    tokens: TokenSource,
    context: Arc<ContextStore>,
    base_url: String,
    enable_context: bool,
}

impl ErnieProvider {
    pub fn new(
        access_key: String,
        secret_key: String,
        enable_context: bool,
    ) -> Result<Self, ChatwireError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| ChatwireError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            tokens: TokenSource::new(client.clone(), access_key, secret_key),
            client,
            context: Arc::new(ContextStore::new()),
            base_url: API_BASE_URL.to_string(),
            enable_context,
        })
    }

    #[cfg(test)]
    fn with_base_urls(mut self, chat_url: String, token_url: String) -> Self {
        self.base_url = chat_url;
        self.tokens = self.tokens.with_token_url(token_url);
        self
    }

    async fn complete(&self, messages: Vec<ChatTurn>) -> Result<ErnieResponse, ChatwireError> {
        let token = self.tokens.token().await?;
        let request = ErnieRequest { messages };
        let response = self
            .client
            .post(&self.base_url)
            .query(&[("access_token", token.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| ChatwireError::Provider {
                message: format!("HTTP request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        debug!(status = %status, "chat response received");
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(ChatwireError::Provider {
                message: format!("API returned {status}: {body}"),
                source: None,
            });
        }

        let parsed: ErnieResponse =
            serde_json::from_str(&body).map_err(|e| ChatwireError::Provider {
                message: format!("failed to parse API response: {e}"),
                source: Some(Box::new(e)),
            })?;
        if let Some((code, message)) = parsed.error() {
            return Err(ChatwireError::Provider {
                message: format!("Ernie API error ({code}): {message}"),
                source: None,
            });
        }
        Ok(parsed)
    }

    async fn complete_with_context(
        &self,
        user: &str,
        content: &str,
    ) -> Result<String, ChatwireError> {
        let entry = self.context.user(user);

        let messages = {
            let mut ctx = entry.lock().await;
            ctx.reserve(estimate_tokens(content), CONTEXT_BUDGET);
            let mut messages = ctx.turns().to_vec();
            messages.push(ChatTurn::user(content));
            messages
        };

        let response = self.complete(messages).await?;
        if !response.result.is_empty() {
            let mut ctx = entry.lock().await;
            ctx.record_exchange(content, &response.result, &response.usage);
            debug!(user, total_tokens = ctx.total_tokens(), "recorded exchange");
        }
        Ok(response.result)
    }
}

#[async_trait]
impl ChatProvider for ErnieProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::ErnieBot
    }

    async fn send_completion(&self, user: &str, content: &str) -> Result<String, ChatwireError> {
        if self.enable_context {
            self.complete_with_context(user, content).await
        } else {
            let response = self.complete(vec![ChatTurn::user(content)]).await?;
            Ok(response.result)
        }
    }

    async fn reset(&self) {
        self.context.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount_token(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/oauth/2.0/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "tok-1",
                "expires_in": 2592000
            })))
            .mount(server)
            .await;
    }

    fn provider(server: &MockServer, enable_context: bool) -> ErnieProvider {
        ErnieProvider::new("ak".into(), "sk".into(), enable_context)
            .unwrap()
            .with_base_urls(
                format!("{}/chat/completions", server.uri()),
                format!("{}/oauth/2.0/token", server.uri()),
            )
    }

    fn reply_body(result: &str, prompt: u64, completion: u64) -> serde_json::Value {
        serde_json::json!({
            "result": result,
            "usage": {
                "prompt_tokens": prompt,
                "completion_tokens": completion,
                "total_tokens": prompt + completion
            }
        })
    }

    #[tokio::test]
    async fn completion_carries_the_exchanged_token() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(query_param("access_token", "tok-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply_body("hello", 4, 2)))
            .mount(&server)
            .await;

        let provider = provider(&server, false);
        let reply = provider.send_completion("u1", "hi").await.unwrap();
        assert_eq!(reply, "hello");
    }

    #[tokio::test]
    async fn token_is_exchanged_once_for_many_completions() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/oauth/2.0/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "tok-1",
                "expires_in": 2592000
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply_body("a", 4, 2)))
            .mount(&server)
            .await;

        let provider = provider(&server, false);
        provider.send_completion("u1", "one").await.unwrap();
        provider.send_completion("u1", "two").await.unwrap();
    }

    #[tokio::test]
    async fn in_band_error_fails_the_completion() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "error_code": 110,
                "error_msg": "Access token invalid"
            })))
            .mount(&server)
            .await;

        let provider = provider(&server, false);
        let err = provider.send_completion("u1", "hi").await.unwrap_err();
        assert!(err.to_string().contains("110"), "got: {err}");
    }

    #[tokio::test]
    async fn context_mode_replays_retained_history() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply_body("a1", 10, 5)))
            .mount(&server)
            .await;

        let provider = provider(&server, true);
        provider.send_completion("u1", "q1").await.unwrap();
        provider.send_completion("u1", "q2").await.unwrap();

        let requests = server.received_requests().await.unwrap();
        let chat_requests: Vec<_> = requests
            .iter()
            .filter(|r| r.url.path().ends_with("/chat/completions"))
            .collect();
        let body: serde_json::Value = serde_json::from_slice(&chat_requests[1].body).unwrap();
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0]["content"], "q1");
        assert_eq!(messages[1]["content"], "a1");
        assert_eq!(messages[2]["content"], "q2");
    }

    #[tokio::test]
    async fn window_is_pinned_to_the_upstream_ceiling() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        // Each exchange retains 1000 prompt-side plus 100 completion-side
        // tokens, so a second large message must evict the first pair even
        // though no budget was configured anywhere near 1500.
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply_body("a", 1000, 100)))
            .mount(&server)
            .await;

        let provider = provider(&server, true);
        provider.send_completion("u1", "q1").await.unwrap();
        provider
            .send_completion("u1", &"x".repeat(500))
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        let chat_requests: Vec<_> = requests
            .iter()
            .filter(|r| r.url.path().ends_with("/chat/completions"))
            .collect();
        let body: serde_json::Value = serde_json::from_slice(&chat_requests[1].body).unwrap();
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn reset_clears_all_history() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply_body("a", 10, 5)))
            .mount(&server)
            .await;

        let provider = provider(&server, true);
        provider.send_completion("u1", "q1").await.unwrap();
        provider.reset().await;
        provider.send_completion("u1", "q2").await.unwrap();

        let requests = server.received_requests().await.unwrap();
        let chat_requests: Vec<_> = requests
            .iter()
            .filter(|r| r.url.path().ends_with("/chat/completions"))
            .collect();
        let body: serde_json::Value = serde_json::from_slice(&chat_requests[1].body).unwrap();
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
    }
}
