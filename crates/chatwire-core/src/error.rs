// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Chatwire connector runtime.

use thiserror::Error;

/// The primary error type used across the Chatwire workspace.
#[derive(Debug, Error)]
pub enum ChatwireError {
    /// Configuration errors (malformed connector config, unsupported chat
    /// mode, missing required identity value).
    #[error("configuration error: {0}")]
    Config(String),

    /// The requested connector is not registered with the runtime.
    #[error("connector not found: {connector_id}")]
    ConnectorNotFound { connector_id: String },

    /// Chat provider errors (API failure, malformed response, remote error
    /// envelope).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The per-user daily completion quota is exhausted.
    #[error("reached the daily limit ({limit}/day)")]
    QuotaExceeded { limit: u32 },

    /// Resource watch errors (list/watch failure against the remote store).
    #[error("watch error: {message}")]
    Watch {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Event publish errors from the configured sink.
    #[error("publish error: {message}")]
    Publish {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Controller startup failure (initial cache sync did not complete).
    #[error("startup error: {0}")]
    Startup(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ChatwireError {
    /// Returns true for the distinguished quota-exhaustion error.
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, ChatwireError::QuotaExceeded { .. })
    }
}
