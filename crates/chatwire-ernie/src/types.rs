// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request and response types for the Ernie chat API.
//!
//! Unlike the GPT API, errors surface inside a 200 response as `error_code`
//! and `error_msg` fields.

use serde::{Deserialize, Serialize};

use chatwire_core::{ChatTurn, TokenUsage};

/// Request body for a chat call.
#[derive(Debug, Clone, Serialize)]
pub struct ErnieRequest {
    /// Retained history turns followed by the new user message.
    pub messages: Vec<ChatTurn>,
}

/// Response body for a chat call.
#[derive(Debug, Clone, Deserialize)]
pub struct ErnieResponse {
    #[serde(default)]
    pub result: String,
    #[serde(default)]
    pub usage: TokenUsage,
    #[serde(default)]
    pub error_code: Option<i64>,
    #[serde(default)]
    pub error_msg: Option<String>,
}

impl ErnieResponse {
    /// In-band API error, if the response carries one.
    pub fn error(&self) -> Option<(i64, &str)> {
        match self.error_code {
            Some(code) if code != 0 => Some((code, self.error_msg.as_deref().unwrap_or(""))),
            _ => None,
        }
    }
}

/// Response body of the OAuth token exchange.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: String,
    /// Token lifetime in seconds.
    #[serde(default)]
    pub expires_in: u64,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn successful_response_has_no_error() {
        let response: ErnieResponse = serde_json::from_value(serde_json::json!({
            "result": "hello",
            "usage": {"prompt_tokens": 4, "completion_tokens": 2, "total_tokens": 6}
        }))
        .unwrap();
        assert!(response.error().is_none());
        assert_eq!(response.result, "hello");
        assert_eq!(response.usage.total_tokens, 6);
    }

    #[test]
    fn in_band_error_is_surfaced() {
        let response: ErnieResponse = serde_json::from_value(serde_json::json!({
            "error_code": 110,
            "error_msg": "Access token invalid"
        }))
        .unwrap();
        assert_eq!(response.error(), Some((110, "Access token invalid")));
        assert_eq!(response.result, "");
    }
}
