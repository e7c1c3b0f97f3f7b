// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the chat-completions endpoint.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use tracing::debug;

use chatwire_core::ChatwireError;

use crate::types::{ApiErrorResponse, ChatCompletionRequest, ChatCompletionResponse};

/// Base URL for the chat-completions API.
const API_BASE_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Bearer-authenticated client for chat-completion calls.
#[derive(Debug, Clone)]
pub struct GptClient {
    client: reqwest::Client,
    base_url: String,
}

impl GptClient {
    pub fn new(token: &str) -> Result<Self, ChatwireError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| ChatwireError::Config(format!("invalid API token value: {e}")))?,
        );
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| ChatwireError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: API_BASE_URL.to_string(),
        })
    }

    /// Overrides the base URL (for testing with wiremock).
    #[cfg(test)]
    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url;
        self
    }

    /// Sends one completion request and returns the parsed response.
    pub async fn complete(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, ChatwireError> {
        let response = self
            .client
            .post(&self.base_url)
            .json(request)
            .send()
            .await
            .map_err(|e| ChatwireError::Provider {
                message: format!("HTTP request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        debug!(status = %status, "completion response received");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = if let Ok(api_err) = serde_json::from_str::<ApiErrorResponse>(&body) {
                format!("GPT API error ({}): {}", api_err.error.type_, api_err.error.message)
            } else {
                format!("API returned {status}: {body}")
            };
            return Err(ChatwireError::Provider { message, source: None });
        }

        let body = response.text().await.map_err(|e| ChatwireError::Provider {
            message: format!("failed to read response body: {e}"),
            source: Some(Box::new(e)),
        })?;
        serde_json::from_str(&body).map_err(|e| ChatwireError::Provider {
            message: format!("failed to parse API response: {e}"),
            source: Some(Box::new(e)),
        })
    }
}
