// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The bounded completion service for one connector.
//!
//! Enforces the per-user daily quota and dispatches to the resolved
//! provider adapter; the context-window policy runs inside the adapter
//! under the user's lock. A background task fires at the top of every hour
//! and, on a UTC day change, clears all quota counts and every provider's
//! retained context.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Timelike, Utc};
use tokio_util::sync::CancellationToken;
use tracing::info;

use chatwire_core::{ChatProvider, ChatwireError, ProviderKind};

use crate::config::ChatAiConfig;
use crate::quota::QuotaTracker;

/// Fixed degraded reply when the provider call failed.
pub const RESPONSE_FAILED: &str = "Get response failed.";
/// Fixed reply when the provider answered with no content.
pub const RESPONSE_EMPTY: &str = "Get response empty.";

/// Per-connector completion service.
pub struct ChatService {
    config: ChatAiConfig,
    gpt: Arc<dyn ChatProvider>,
    ernie: Arc<dyn ChatProvider>,
    quota: QuotaTracker,
    limit_message: String,
    rollover: CancellationToken,
}

impl ChatService {
    /// Builds a service from the parsed connector config, constructing the
    /// real provider adapters from its credentials.
    pub fn new(config: ChatAiConfig) -> Result<Arc<Self>, ChatwireError> {
        let gpt = Arc::new(chatwire_gpt::GptProvider::new(
            config.gpt.token.clone(),
            config.max_tokens,
            config.enable_context,
        )?);
        let ernie = Arc::new(chatwire_ernie::ErnieProvider::new(
            config.ernie_bot.access_key.clone(),
            config.ernie_bot.secret_key.clone(),
            config.enable_context,
        )?);
        Ok(Self::with_providers(config, gpt, ernie))
    }

    /// Builds a service over explicitly supplied provider adapters.
    pub fn with_providers(
        config: ChatAiConfig,
        gpt: Arc<dyn ChatProvider>,
        ernie: Arc<dyn ChatProvider>,
    ) -> Arc<Self> {
        let limit_message = format!(
            "You've reached the daily limit ({}/day). Your quota will be restored tomorrow.",
            config.everyday_limit
        );
        let service = Arc::new(Self {
            config,
            gpt,
            ernie,
            quota: QuotaTracker::new(),
            limit_message,
            rollover: CancellationToken::new(),
        });
        // The task holds only a weak handle so dropping the last strong
        // reference tears the loop down even without an explicit close().
        tokio::spawn(rollover_loop(
            Arc::downgrade(&service),
            service.rollover.clone(),
        ));
        service
    }

    /// The fixed user-visible message for an exhausted quota.
    pub fn limit_message(&self) -> &str {
        &self.limit_message
    }

    pub fn config(&self) -> &ChatAiConfig {
        &self.config
    }

    /// Stops the rollover task. In-flight completions are left to finish.
    pub fn close(&self) {
        self.rollover.cancel();
    }

    /// Runs one completion for `user`.
    ///
    /// - An empty message returns an empty reply with no side effects.
    /// - At or above the daily limit, fails with
    ///   [`ChatwireError::QuotaExceeded`] without calling the provider or
    ///   touching any counter.
    /// - A provider failure propagates without consuming quota.
    /// - A successful call with empty content returns [`RESPONSE_EMPTY`]
    ///   without consuming quota.
    /// - Only a successful, non-empty completion increments the counter.
    pub async fn completion(
        &self,
        provider: Option<ProviderKind>,
        user: &str,
        content: &str,
    ) -> Result<String, ChatwireError> {
        if content.is_empty() {
            return Ok(String::new());
        }
        let kind = provider.unwrap_or(self.config.default_chat_mode);

        let used = self.quota.count(user).await;
        if used >= self.config.everyday_limit {
            return Err(ChatwireError::QuotaExceeded {
                limit: self.config.everyday_limit,
            });
        }

        info!(user, provider = %kind, "dispatching completion");
        let adapter = self.adapter(kind);
        let reply = adapter.send_completion(user, content).await?;
        if reply.is_empty() {
            return Ok(RESPONSE_EMPTY.to_string());
        }

        self.quota.record(user).await;
        Ok(reply)
    }

    /// Maps a completion error to the fixed user-visible reply carried in
    /// the published event.
    pub fn degraded_reply(&self, err: &ChatwireError) -> String {
        if err.is_quota_exceeded() {
            self.limit_message.clone()
        } else {
            RESPONSE_FAILED.to_string()
        }
    }

    fn adapter(&self, kind: ProviderKind) -> &Arc<dyn ChatProvider> {
        match kind {
            ProviderKind::ChatGpt => &self.gpt,
            ProviderKind::ErnieBot => &self.ernie,
        }
    }

    /// Clears quota counts and all provider context when the UTC day has
    /// changed since the last check.
    pub(crate) async fn run_rollover_check(&self) {
        if self.quota.reset_if_new_day().await {
            self.gpt.reset().await;
            self.ernie.reset().await;
            info!("daily rollover: quota and provider contexts cleared");
        }
    }

    #[cfg(test)]
    pub(crate) fn quota(&self) -> &QuotaTracker {
        &self.quota
    }
}

impl Drop for ChatService {
    fn drop(&mut self) {
        self.rollover.cancel();
    }
}

/// Fires at the top of every hour until cancelled or the service is gone.
/// Ticks are handled sequentially in this one task, so a rollover can never
/// overlap the next tick.
async fn rollover_loop(service: std::sync::Weak<ChatService>, cancel: CancellationToken) {
    tokio::select! {
        _ = cancel.cancelled() => return,
        _ = tokio::time::sleep(until_next_hour()) => {}
    }

    let mut tick = tokio::time::interval(Duration::from_secs(3600));
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    // The first interval tick completes immediately; consume it so the
    // check below runs once per hour boundary.
    tick.tick().await;
    loop {
        let Some(service) = service.upgrade() else {
            return;
        };
        service.run_rollover_check().await;
        drop(service);

        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tick.tick() => {}
        }
    }
}

/// Duration until the next top of the hour (UTC).
fn until_next_hour() -> Duration {
    let now = Utc::now();
    let seconds_into_hour = u64::from(now.minute()) * 60 + u64::from(now.second());
    Duration::from_secs(3600 - seconds_into_hour.min(3599))
}
