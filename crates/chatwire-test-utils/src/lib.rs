// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deterministic test fixtures for the Chatwire workspace.
//!
//! Programmable stand-ins for every external collaborator: the remote
//! resource store, the chat provider APIs, the host reconciler callbacks,
//! and the event transport.

pub mod memory_sink;
pub mod mock_provider;
pub mod mock_watcher;
pub mod recording_handler;

pub use memory_sink::MemorySink;
pub use mock_provider::MockChatProvider;
pub use mock_watcher::MockWatcher;
pub use recording_handler::{HandlerCall, RecordingHandler};
