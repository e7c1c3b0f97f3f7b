// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Chatwire connector runtime.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level runtime configuration.
///
/// Loaded from TOML files with environment variable overrides. All sections
/// are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Process-wide runtime settings.
    #[serde(default)]
    pub runtime: RuntimeSection,

    /// Predicate selecting which connector resources this runtime manages.
    #[serde(default)]
    pub filter: FilterConfig,

    /// Reconciliation controller tuning.
    #[serde(default)]
    pub controller: ControllerSection,

    /// Destination for published completion events.
    #[serde(default)]
    pub events: EventsConfig,
}

/// Process-wide runtime settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RuntimeSection {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for RuntimeSection {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Connector selection predicate.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FilterConfig {
    /// Connector kind to manage.
    #[serde(default = "default_filter_kind")]
    pub kind: String,

    /// Connector type to manage.
    #[serde(default = "default_filter_type", rename = "type")]
    pub type_: String,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            kind: default_filter_kind(),
            type_: default_filter_type(),
        }
    }
}

fn default_filter_kind() -> String {
    "source".to_string()
}

fn default_filter_type() -> String {
    "chatai".to_string()
}

/// Reconciliation controller tuning.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ControllerSection {
    /// Workers draining each reconciliation queue.
    #[serde(default = "default_workers_per_queue")]
    pub workers_per_queue: usize,

    /// Interval between full cache resyncs, in seconds.
    #[serde(default = "default_resync_interval_secs")]
    pub resync_interval_secs: u64,

    /// How long startup waits for the initial cache sync, in seconds.
    #[serde(default = "default_sync_timeout_secs")]
    pub sync_timeout_secs: u64,
}

impl ControllerSection {
    pub fn resync_interval(&self) -> Duration {
        Duration::from_secs(self.resync_interval_secs)
    }

    pub fn sync_timeout(&self) -> Duration {
        Duration::from_secs(self.sync_timeout_secs)
    }
}

impl Default for ControllerSection {
    fn default() -> Self {
        Self {
            workers_per_queue: default_workers_per_queue(),
            resync_interval_secs: default_resync_interval_secs(),
            sync_timeout_secs: default_sync_timeout_secs(),
        }
    }
}

fn default_workers_per_queue() -> usize {
    1
}

fn default_resync_interval_secs() -> u64 {
    60
}

fn default_sync_timeout_secs() -> u64 {
    30
}

/// Destination for published completion events.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EventsConfig {
    /// Gateway endpoint events are delivered to.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Bearer token presented to the gateway, if it requires one.
    #[serde(default)]
    pub token: Option<String>,
}
