// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Registry of live per-connector services and the inbound request path.
//!
//! The runtime is the [`ConnectorHandler`] the controller drives: add and
//! update materialize a [`ChatService`] from the connector's config blob,
//! delete tears it down. Inbound completion requests are routed to the
//! service by connector id and their outcomes are published as events.

use std::sync::Arc;

use dashmap::DashMap;
use serde::Deserialize;
use tracing::{debug, info, warn};

use async_trait::async_trait;
use chatwire_core::{ChatwireError, ConnectorHandler, EventEnvelope, EventSink, ProviderKind};

use crate::config::{ChatAiConfig, ProcessMode};
use crate::service::ChatService;

/// Event type stamped on published completion events unless the request
/// overrides it.
pub const DEFAULT_EVENT_TYPE: &str = "chatwire-chatai-type";
/// Event source stamped on published completion events unless the request
/// overrides it.
pub const DEFAULT_EVENT_SOURCE: &str = "chatwire-chatai-source";

/// User identity applied when no identifier header is configured and the
/// request carries none.
const ANONYMOUS_USER: &str = "anonymous";

/// One inbound completion request, already bound to a connector.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompletionRequest {
    /// The user's message. Empty is acknowledged without any provider call.
    #[serde(default)]
    pub message: String,
    /// Provider override; absent falls back to the connector's default.
    #[serde(default)]
    pub provider: Option<ProviderKind>,
    /// Requesting user identity, normally lifted from the identifier header.
    #[serde(default)]
    pub user: Option<String>,
    /// Overrides the connector's default acknowledgement mode.
    #[serde(default)]
    pub sync: Option<bool>,
    #[serde(default)]
    pub event_type: Option<String>,
    #[serde(default)]
    pub event_source: Option<String>,
}

/// Acknowledgement returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub code: u16,
    pub message: String,
}

impl ApiResponse {
    fn success() -> Self {
        Self {
            code: 200,
            message: "success".to_string(),
        }
    }
}

struct RuntimeEntry {
    raw_config: String,
    service: Arc<ChatService>,
}

type ServiceFactory =
    dyn Fn(ChatAiConfig) -> Result<Arc<ChatService>, ChatwireError> + Send + Sync;

/// Live connector registry and request dispatcher.
pub struct ChatRuntime {
    entries: DashMap<String, RuntimeEntry>,
    sink: Arc<dyn EventSink>,
    factory: Box<ServiceFactory>,
}

impl ChatRuntime {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self::with_factory(sink, Box::new(ChatService::new))
    }

    /// Builds a runtime whose services come from `factory` instead of the
    /// real provider adapters. Test seam.
    pub fn with_factory(sink: Arc<dyn EventSink>, factory: Box<ServiceFactory>) -> Self {
        Self {
            entries: DashMap::new(),
            sink,
            factory,
        }
    }

    /// Parses the config blob and (re)builds the connector's service.
    ///
    /// Registration is idempotent on the raw blob: re-delivery of an
    /// unchanged config keeps the existing service, its quota counts and
    /// retained context untouched.
    fn register(&self, connector_id: &str, raw_config: &str) -> Result<(), ChatwireError> {
        if let Some(entry) = self.entries.get(connector_id) {
            if entry.raw_config == raw_config {
                debug!(connector_id, "config unchanged, keeping existing service");
                return Ok(());
            }
        }

        let config = ChatAiConfig::parse(raw_config)?;
        let service = (self.factory)(config)?;
        info!(connector_id, "connector service (re)built");
        if let Some((_, old)) = self.entries.remove(connector_id) {
            old.service.close();
        }
        self.entries.insert(
            connector_id.to_string(),
            RuntimeEntry {
                raw_config: raw_config.to_string(),
                service,
            },
        );
        Ok(())
    }

    pub fn contains(&self, connector_id: &str) -> bool {
        self.entries.contains_key(connector_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Handles one inbound completion request for `connector_id`.
    ///
    /// Fails fast on an unknown connector and on a missing identity when
    /// the connector requires one. An empty message is acknowledged without
    /// touching the provider or publishing anything. Otherwise the
    /// completion runs and its outcome (the reply, or the fixed degraded
    /// message) is published; in async mode the acknowledgement does not
    /// wait for that work.
    pub async fn handle(
        &self,
        connector_id: &str,
        request: CompletionRequest,
    ) -> Result<ApiResponse, ChatwireError> {
        let service = {
            let entry = self.entries.get(connector_id).ok_or_else(|| {
                ChatwireError::ConnectorNotFound {
                    connector_id: connector_id.to_string(),
                }
            })?;
            Arc::clone(&entry.service)
        };

        let user = match (&service.config().user_identifier_header, request.user) {
            (Some(header), None) => {
                return Err(ChatwireError::Config(format!(
                    "missing user identity: header {header:?} is required"
                )));
            }
            (_, Some(user)) => user,
            (None, None) => ANONYMOUS_USER.to_string(),
        };

        if request.message.is_empty() {
            return Ok(ApiResponse::success());
        }

        let sync = request
            .sync
            .unwrap_or(service.config().default_process_mode == ProcessMode::Sync);
        let event_type = request
            .event_type
            .unwrap_or_else(|| DEFAULT_EVENT_TYPE.to_string());
        let event_source = request
            .event_source
            .unwrap_or_else(|| DEFAULT_EVENT_SOURCE.to_string());

        let sink = Arc::clone(&self.sink);
        let provider = request.provider;
        let message = request.message;
        let work = async move {
            let content = match service.completion(provider, &user, &message).await {
                Ok(reply) => reply,
                Err(err) => {
                    warn!(user, error = %err, "completion failed");
                    service.degraded_reply(&err)
                }
            };
            let event = EventEnvelope::new(
                event_type,
                event_source,
                serde_json::json!({ "result": content }),
            );
            if let Err(err) = sink.publish(event).await {
                warn!(error = %err, "failed to publish completion event");
            }
        };

        if sync {
            work.await;
        } else {
            tokio::spawn(work);
        }
        Ok(ApiResponse::success())
    }
}

#[async_trait]
impl ConnectorHandler for ChatRuntime {
    async fn on_add(&self, connector_id: &str, config: &str) -> Result<(), ChatwireError> {
        self.register(connector_id, config)
    }

    async fn on_update(&self, connector_id: &str, config: &str) -> Result<(), ChatwireError> {
        self.register(connector_id, config)
    }

    /// Removing an unknown connector is already resolved, not an error.
    async fn on_delete(&self, connector_id: &str) -> Result<(), ChatwireError> {
        match self.entries.remove(connector_id) {
            Some((_, entry)) => {
                entry.service.close();
                info!(connector_id, "connector service removed");
                Ok(())
            }
            None => {
                debug!(connector_id, "delete for unknown connector, ignoring");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use chatwire_test_utils::{MemorySink, MockChatProvider};

    struct Fixture {
        runtime: ChatRuntime,
        sink: Arc<MemorySink>,
        gpt: Arc<MockChatProvider>,
        builds: Arc<AtomicU32>,
    }

    fn fixture() -> Fixture {
        let sink = Arc::new(MemorySink::new());
        let gpt = Arc::new(MockChatProvider::new(ProviderKind::ChatGpt));
        let builds = Arc::new(AtomicU32::new(0));

        let factory_gpt = Arc::clone(&gpt);
        let factory_builds = Arc::clone(&builds);
        let runtime = ChatRuntime::with_factory(
            Arc::clone(&sink) as _,
            Box::new(move |config| {
                factory_builds.fetch_add(1, Ordering::SeqCst);
                let ernie = Arc::new(MockChatProvider::new(ProviderKind::ErnieBot));
                Ok(ChatService::with_providers(
                    config,
                    Arc::clone(&factory_gpt) as _,
                    ernie as _,
                ))
            }),
        );
        Fixture {
            runtime,
            sink,
            gpt,
            builds,
        }
    }

    async fn wait_for_events(sink: &MemorySink, n: usize) -> Vec<EventEnvelope> {
        for _ in 0..100 {
            let events = sink.events().await;
            if events.len() >= n {
                return events;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("sink never reached {n} events");
    }

    #[tokio::test]
    async fn unknown_connector_is_rejected() {
        let f = fixture();
        let err = f
            .runtime
            .handle("nope", CompletionRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ChatwireError::ConnectorNotFound { .. }));
    }

    #[tokio::test]
    async fn unchanged_config_does_not_rebuild_the_service() {
        let f = fixture();
        f.runtime.on_add("c1", "everyday_limit: 3").await.unwrap();
        f.runtime.on_update("c1", "everyday_limit: 3").await.unwrap();
        assert_eq!(f.builds.load(Ordering::SeqCst), 1);

        f.runtime.on_update("c1", "everyday_limit: 5").await.unwrap();
        assert_eq!(f.builds.load(Ordering::SeqCst), 2);
        assert_eq!(f.runtime.len(), 1);
    }

    #[tokio::test]
    async fn malformed_config_fails_registration() {
        let f = fixture();
        let err = f.runtime.on_add("c1", ": not yaml").await.unwrap_err();
        assert!(matches!(err, ChatwireError::Config(_)));
        assert!(!f.runtime.contains("c1"));
    }

    #[tokio::test]
    async fn missing_identity_is_rejected_when_header_is_required() {
        let f = fixture();
        f.runtime
            .on_add("c1", "user_identifier_header: \"x-user-id\"")
            .await
            .unwrap();
        let err = f
            .runtime
            .handle(
                "c1",
                CompletionRequest {
                    message: "hi".to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ChatwireError::Config(_)));
        assert_eq!(f.gpt.call_count().await, 0);
    }

    #[tokio::test]
    async fn empty_message_acknowledges_without_publishing() {
        let f = fixture();
        f.runtime.on_add("c1", "everyday_limit: 3").await.unwrap();
        let resp = f
            .runtime
            .handle("c1", CompletionRequest::default())
            .await
            .unwrap();
        assert_eq!(resp.code, 200);
        assert!(f.sink.events().await.is_empty());
        assert_eq!(f.gpt.call_count().await, 0);
    }

    #[tokio::test]
    async fn sync_completion_publishes_the_reply() {
        let f = fixture();
        f.runtime.on_add("c1", "everyday_limit: 3").await.unwrap();
        f.gpt.add_reply("forty-two").await;

        let resp = f
            .runtime
            .handle(
                "c1",
                CompletionRequest {
                    message: "meaning of life?".to_string(),
                    sync: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(resp, ApiResponse::success());

        let events = f.sink.events().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].type_, DEFAULT_EVENT_TYPE);
        assert_eq!(events[0].source, DEFAULT_EVENT_SOURCE);
        assert_eq!(events[0].data["result"], "forty-two");
    }

    #[tokio::test]
    async fn async_completion_acknowledges_before_publishing() {
        let f = fixture();
        f.runtime.on_add("c1", "everyday_limit: 3").await.unwrap();
        let resp = f
            .runtime
            .handle(
                "c1",
                CompletionRequest {
                    message: "hi".to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(resp.code, 200);
        let events = wait_for_events(&f.sink, 1).await;
        assert_eq!(events[0].data["result"], "mock reply");
    }

    #[tokio::test]
    async fn request_event_metadata_overrides_defaults() {
        let f = fixture();
        f.runtime.on_add("c1", "everyday_limit: 3").await.unwrap();
        f.runtime
            .handle(
                "c1",
                CompletionRequest {
                    message: "hi".to_string(),
                    sync: Some(true),
                    event_type: Some("custom-type".to_string()),
                    event_source: Some("custom-source".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let events = f.sink.events().await;
        assert_eq!(events[0].type_, "custom-type");
        assert_eq!(events[0].source, "custom-source");
    }

    #[tokio::test]
    async fn provider_failure_publishes_the_degraded_reply() {
        let f = fixture();
        f.runtime.on_add("c1", "everyday_limit: 3").await.unwrap();
        f.gpt.fail_next(1);
        f.runtime
            .handle(
                "c1",
                CompletionRequest {
                    message: "hi".to_string(),
                    sync: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let events = f.sink.events().await;
        assert_eq!(events[0].data["result"], crate::service::RESPONSE_FAILED);
    }

    #[tokio::test]
    async fn exhausted_quota_publishes_the_limit_message() {
        let f = fixture();
        f.runtime.on_add("c1", "everyday_limit: 1").await.unwrap();
        let req = || CompletionRequest {
            message: "hi".to_string(),
            sync: Some(true),
            ..Default::default()
        };
        f.runtime.handle("c1", req()).await.unwrap();
        f.runtime.handle("c1", req()).await.unwrap();

        let events = f.sink.events().await;
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[1].data["result"],
            "You've reached the daily limit (1/day). Your quota will be restored tomorrow."
        );
    }

    #[tokio::test]
    async fn delete_removes_the_connector() {
        let f = fixture();
        f.runtime.on_add("c1", "everyday_limit: 3").await.unwrap();
        f.runtime.on_delete("c1").await.unwrap();
        assert!(!f.runtime.contains("c1"));
        let err = f
            .runtime
            .handle("c1", CompletionRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ChatwireError::ConnectorNotFound { .. }));

        // Deleting again is fine.
        f.runtime.on_delete("c1").await.unwrap();
    }
}
