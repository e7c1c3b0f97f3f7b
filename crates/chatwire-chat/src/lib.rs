// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded chat-completion service.
//!
//! A [`ChatRuntime`] holds one [`ChatService`] per registered connector.
//! Each service enforces a per-user daily quota, dispatches requests to a
//! provider adapter, and publishes completion outcomes as events.

pub mod config;
pub mod quota;
pub mod runtime;
pub mod service;

pub use config::{ChatAiConfig, ErnieCredentials, GptCredentials, ProcessMode};
pub use quota::QuotaTracker;
pub use runtime::{
    ApiResponse, ChatRuntime, CompletionRequest, DEFAULT_EVENT_SOURCE, DEFAULT_EVENT_TYPE,
};
pub use service::{ChatService, RESPONSE_EMPTY, RESPONSE_FAILED};
