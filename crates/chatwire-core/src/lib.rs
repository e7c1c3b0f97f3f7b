// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Chatwire connector runtime.
//!
//! This crate provides the shared error type, common types, and the trait
//! seams between the reconciliation controller, the completion service,
//! and their external collaborators (remote resource store, chat provider
//! APIs, event transport).

pub mod error;
pub mod traits;
pub mod types;

pub use error::ChatwireError;
pub use types::{
    ChatRole, ChatTurn, ConnectorRecord, EventEnvelope, ProviderKind, ReconcileKey, TokenUsage,
};

pub use traits::{
    ChatProvider, ConnectorHandler, ConnectorWatcher, EventSink, WatchEvent, WatchEventStream,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_variants_construct() {
        let _config = ChatwireError::Config("bad yaml".into());
        let _not_found = ChatwireError::ConnectorNotFound {
            connector_id: "c1".into(),
        };
        let _provider = ChatwireError::Provider {
            message: "api failure".into(),
            source: None,
        };
        let _quota = ChatwireError::QuotaExceeded { limit: 100 };
        let _watch = ChatwireError::Watch {
            message: "list failed".into(),
            source: Some(Box::new(std::io::Error::other("conn reset"))),
        };
        let _publish = ChatwireError::Publish {
            message: "sink down".into(),
            source: None,
        };
        let _startup = ChatwireError::Startup("cache sync timed out".into());
        let _internal = ChatwireError::Internal("unexpected".into());
    }

    #[test]
    fn quota_exceeded_is_distinguished() {
        let quota = ChatwireError::QuotaExceeded { limit: 3 };
        assert!(quota.is_quota_exceeded());
        assert!(!ChatwireError::Config("x".into()).is_quota_exceeded());
        assert_eq!(quota.to_string(), "reached the daily limit (3/day)");
    }

    #[test]
    fn trait_objects_are_usable() {
        fn _assert_provider(_: &dyn ChatProvider) {}
        fn _assert_handler(_: &dyn ConnectorHandler) {}
        fn _assert_sink(_: &dyn EventSink) {}
        fn _assert_watcher(_: &dyn ConnectorWatcher) {}
    }
}
