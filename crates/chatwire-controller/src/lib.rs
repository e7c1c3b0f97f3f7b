// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Level-triggered reconciliation controller for connector resources.
//!
//! Mirrors a remote connector collection into a local [`cache::WatchCache`],
//! gates notifications through a [`filter::ConnectorFilter`], and drives
//! idempotent [`ConnectorHandler`](chatwire_core::ConnectorHandler)
//! callbacks through three deduplicating, rate-limited
//! [`queue::WorkQueue`]s.

pub mod cache;
pub mod controller;
pub mod filter;
pub mod queue;

pub use cache::{CacheEvent, WatchCache};
pub use controller::{Controller, ControllerConfig};
pub use filter::ConnectorFilter;
pub use queue::WorkQueue;
