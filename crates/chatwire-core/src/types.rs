// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared across the Chatwire workspace.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Deduplication key for reconciliation queues, derived from a record's
/// namespace-qualified name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReconcileKey(pub String);

impl ReconcileKey {
    /// Builds the key from a namespace and resource name.
    pub fn from_parts(namespace: &str, name: &str) -> Self {
        Self(format!("{namespace}/{name}"))
    }
}

impl std::fmt::Display for ReconcileKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Last-observed state of one connector resource in the remote store.
///
/// Owned by the watch cache and replaced wholesale on every observed
/// mutation; at most one record exists per [`ReconcileKey`] at any instant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectorRecord {
    pub namespace: String,
    pub name: String,
    /// Stable connector identifier handed to reconciler callbacks.
    pub connector_id: String,
    pub kind: String,
    #[serde(rename = "type")]
    pub type_: String,
    /// Opaque serialized configuration blob, parsed by the host application.
    pub config: String,
    pub resource_version: String,
}

impl ConnectorRecord {
    /// The cache/queue key for this record.
    pub fn key(&self) -> ReconcileKey {
        ReconcileKey::from_parts(&self.namespace, &self.name)
    }
}

/// The chat providers supported by the completion service.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum ProviderKind {
    #[strum(serialize = "chatgpt")]
    #[serde(rename = "chatgpt")]
    ChatGpt,
    #[strum(serialize = "wenxin")]
    #[serde(rename = "wenxin")]
    ErnieBot,
}

/// Role of a single conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One retained (role, content) turn of a user's conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Token accounting reported by a provider for one completion exchange.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

/// Envelope published to the event sink for every completion result.
///
/// Delivery and acknowledgement semantics belong to the sink, not to the
/// completion path that builds the envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub id: String,
    pub time: DateTime<Utc>,
    #[serde(rename = "type")]
    pub type_: String,
    pub source: String,
    pub data: serde_json::Value,
}

impl EventEnvelope {
    /// Builds an envelope with a fresh unique id and the current timestamp.
    pub fn new(
        type_: impl Into<String>,
        source: impl Into<String>,
        data: serde_json::Value,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            time: Utc::now(),
            type_: type_.into(),
            source: source.into(),
            data,
        }
    }
}
