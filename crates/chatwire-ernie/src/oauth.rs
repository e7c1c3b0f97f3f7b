// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Access-token exchange and caching for the Ernie API.
//!
//! The key pair is traded for a bearer token carried as a query parameter.
//! The token is cached until shortly before its reported expiry; concurrent
//! callers share one exchange under the cache lock.

use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::debug;

use chatwire_core::ChatwireError;

use crate::types::TokenResponse;

const TOKEN_URL: &str = "https://aip.baidubce.com/oauth/2.0/token";

/// Tokens are refreshed this long before their reported expiry.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: Instant,
}

/// Cached client-credentials token source.
#[derive(Debug)]
pub struct TokenSource {
    client: reqwest::Client,
    access_key: String,
    secret_key: String,
    token_url: String,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenSource {
    pub fn new(client: reqwest::Client, access_key: String, secret_key: String) -> Self {
        Self {
            client,
            access_key,
            secret_key,
            token_url: TOKEN_URL.to_string(),
            cached: Mutex::new(None),
        }
    }

    #[cfg(test)]
    pub fn with_token_url(mut self, url: String) -> Self {
        self.token_url = url;
        self
    }

    /// A currently valid access token, exchanged fresh if the cached one is
    /// absent or about to expire.
    pub async fn token(&self) -> Result<String, ChatwireError> {
        let mut cached = self.cached.lock().await;
        if let Some(entry) = cached.as_ref() {
            if Instant::now() < entry.expires_at {
                return Ok(entry.token.clone());
            }
        }

        let fresh = self.exchange().await?;
        let token = fresh.token.clone();
        *cached = Some(fresh);
        Ok(token)
    }

    async fn exchange(&self) -> Result<CachedToken, ChatwireError> {
        debug!("exchanging key pair for access token");
        let response = self
            .client
            .get(&self.token_url)
            .query(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.access_key.as_str()),
                ("client_secret", self.secret_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ChatwireError::Provider {
                message: format!("token exchange request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(ChatwireError::Provider {
                message: format!("token exchange returned {status}: {body}"),
                source: None,
            });
        }

        let parsed: TokenResponse =
            serde_json::from_str(&body).map_err(|e| ChatwireError::Provider {
                message: format!("failed to parse token response: {e}"),
                source: Some(Box::new(e)),
            })?;
        if let Some(error) = parsed.error {
            return Err(ChatwireError::Config(format!(
                "token exchange rejected ({error}): {}",
                parsed.error_description.unwrap_or_default()
            )));
        }
        if parsed.access_token.is_empty() {
            return Err(ChatwireError::Provider {
                message: "token exchange returned an empty access token".to_string(),
                source: None,
            });
        }

        let lifetime = Duration::from_secs(parsed.expires_in)
            .saturating_sub(EXPIRY_MARGIN)
            .max(Duration::from_secs(1));
        Ok(CachedToken {
            token: parsed.access_token,
            expires_at: Instant::now() + lifetime,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn source(url: &str) -> TokenSource {
        TokenSource::new(reqwest::Client::new(), "ak".into(), "sk".into())
            .with_token_url(format!("{url}/oauth/2.0/token"))
    }

    #[tokio::test]
    async fn exchange_sends_client_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/oauth/2.0/token"))
            .and(query_param("grant_type", "client_credentials"))
            .and(query_param("client_id", "ak"))
            .and(query_param("client_secret", "sk"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "token-1",
                "expires_in": 2592000
            })))
            .mount(&server)
            .await;

        let source = source(&server.uri());
        assert_eq!(source.token().await.unwrap(), "token-1");
    }

    #[tokio::test]
    async fn token_is_cached_across_calls() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/oauth/2.0/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "token-1",
                "expires_in": 2592000
            })))
            .expect(1)
            .mount(&server)
            .await;

        let source = source(&server.uri());
        source.token().await.unwrap();
        source.token().await.unwrap();
    }

    #[tokio::test]
    async fn rejected_credentials_are_a_config_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/oauth/2.0/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "error": "invalid_client",
                "error_description": "unknown client id"
            })))
            .mount(&server)
            .await;

        let source = source(&server.uri());
        let err = source.token().await.unwrap_err();
        assert!(matches!(err, ChatwireError::Config(_)));
        assert!(err.to_string().contains("invalid_client"));
    }

    #[tokio::test]
    async fn expired_token_is_re_exchanged() {
        let server = MockServer::start().await;
        // expires_in below the refresh margin: the cached entry is stale on
        // the next call.
        Mock::given(method("GET"))
            .and(path("/oauth/2.0/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "short-lived",
                "expires_in": 1
            })))
            .expect(2)
            .mount(&server)
            .await;

        let source = source(&server.uri());
        source.token().await.unwrap();
        tokio::time::sleep(Duration::from_millis(1100)).await;
        source.token().await.unwrap();
    }
}
