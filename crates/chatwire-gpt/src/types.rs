// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request and response types for the chat-completions API.

use serde::{Deserialize, Serialize};

use chatwire_core::{ChatTurn, TokenUsage};

/// Request body for a chat-completion call.
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    /// Retained history turns followed by the new user message.
    pub messages: Vec<ChatTurn>,
}

/// One candidate completion.
#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    pub message: ChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: String,
}

/// Response body for a chat-completion call.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: TokenUsage,
}

impl ChatCompletionResponse {
    /// The first candidate's content; empty when the API returned none.
    pub fn first_content(&self) -> &str {
        self.choices.first().map(|c| c.message.content.as_str()).unwrap_or("")
    }
}

/// Error envelope returned on non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiError,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
    #[serde(default, rename = "type")]
    pub type_: String,
    #[serde(default)]
    pub message: String,
}
