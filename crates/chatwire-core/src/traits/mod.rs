// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait seams between the runtime core and its collaborators.

pub mod events;
pub mod handler;
pub mod provider;
pub mod watcher;

pub use events::EventSink;
pub use handler::ConnectorHandler;
pub use provider::ChatProvider;
pub use watcher::{ConnectorWatcher, WatchEvent, WatchEventStream};
