// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-connector chat configuration, parsed from the connector's opaque
//! serialized config blob (YAML). Immutable after parse.

use serde::Deserialize;

use chatwire_core::{ChatwireError, ProviderKind};

/// Sync/async acknowledgement mode for inbound completion requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessMode {
    Sync,
    #[default]
    Async,
}

/// Static credentials for the GPT-style provider.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GptCredentials {
    #[serde(default)]
    pub token: String,
}

/// Key pair exchanged for an access token by the Ernie-style provider.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErnieCredentials {
    #[serde(default)]
    pub access_key: String,
    #[serde(default)]
    pub secret_key: String,
}

/// Immutable per-connector configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatAiConfig {
    /// Destination reference for published completion events.
    #[serde(default)]
    pub target: String,

    /// Context-window token budget per user.
    #[serde(default)]
    pub max_tokens: u64,

    /// Daily successful-completion quota per user.
    #[serde(default)]
    pub everyday_limit: u32,

    /// Whether per-user conversation history is retained.
    #[serde(default)]
    pub enable_context: bool,

    /// Acknowledgement mode when the request does not specify one.
    #[serde(default)]
    pub default_process_mode: ProcessMode,

    /// Name of the request header carrying the user identity. When set, a
    /// request without an identity value is rejected.
    #[serde(default)]
    pub user_identifier_header: Option<String>,

    /// Provider used when the request does not name one.
    #[serde(default = "default_chat_mode")]
    pub default_chat_mode: ProviderKind,

    #[serde(default)]
    pub gpt: GptCredentials,

    #[serde(default)]
    pub ernie_bot: ErnieCredentials,
}

fn default_chat_mode() -> ProviderKind {
    ProviderKind::ChatGpt
}

const DEFAULT_MAX_TOKENS: u64 = 3500;
const DEFAULT_EVERYDAY_LIMIT: u32 = 1000;

impl ChatAiConfig {
    /// Parses the YAML blob and applies defaults for absent or zero-valued
    /// limits.
    pub fn parse(raw: &str) -> Result<Self, ChatwireError> {
        let mut config: ChatAiConfig = serde_yaml::from_str(raw)
            .map_err(|e| ChatwireError::Config(format!("malformed connector config: {e}")))?;
        if config.max_tokens == 0 {
            config.max_tokens = DEFAULT_MAX_TOKENS;
        }
        if config.everyday_limit == 0 {
            config.everyday_limit = DEFAULT_EVERYDAY_LIMIT;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_config() {
        let raw = r#"
target: "http://gateway/namespaces/default/eventbus/chat"
max_tokens: 100
everyday_limit: 3
enable_context: true
default_process_mode: sync
user_identifier_header: "x-user-id"
default_chat_mode: wenxin
gpt:
  token: "sk-test"
ernie_bot:
  access_key: "ak"
  secret_key: "sk"
"#;
        let config = ChatAiConfig::parse(raw).unwrap();
        assert_eq!(config.max_tokens, 100);
        assert_eq!(config.everyday_limit, 3);
        assert!(config.enable_context);
        assert_eq!(config.default_process_mode, ProcessMode::Sync);
        assert_eq!(config.user_identifier_header.as_deref(), Some("x-user-id"));
        assert_eq!(config.default_chat_mode, ProviderKind::ErnieBot);
        assert_eq!(config.gpt.token, "sk-test");
        assert_eq!(config.ernie_bot.access_key, "ak");
    }

    #[test]
    fn absent_limits_fall_back_to_defaults() {
        let config = ChatAiConfig::parse("target: \"http://gateway\"").unwrap();
        assert_eq!(config.max_tokens, 3500);
        assert_eq!(config.everyday_limit, 1000);
        assert_eq!(config.default_chat_mode, ProviderKind::ChatGpt);
        assert_eq!(config.default_process_mode, ProcessMode::Async);
        assert!(!config.enable_context);
        assert!(config.user_identifier_header.is_none());
    }

    #[test]
    fn zero_limits_fall_back_to_defaults() {
        let config = ChatAiConfig::parse("max_tokens: 0\neveryday_limit: 0").unwrap();
        assert_eq!(config.max_tokens, 3500);
        assert_eq!(config.everyday_limit, 1000);
    }

    #[test]
    fn malformed_yaml_is_a_config_error() {
        let err = ChatAiConfig::parse(": not yaml").unwrap_err();
        assert!(matches!(err, ChatwireError::Config(_)));
    }

    #[test]
    fn unknown_chat_mode_is_a_config_error() {
        let err = ChatAiConfig::parse("default_chat_mode: bard").unwrap_err();
        assert!(matches!(err, ChatwireError::Config(_)));
    }
}
