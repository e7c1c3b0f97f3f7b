// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Merge order: compiled defaults, then `/etc/chatwire/chatwire.toml`, then
//! `./chatwire.toml`, then `CHATWIRE_*` environment variables.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::RuntimeConfig;

/// Load configuration from the standard file hierarchy with env overrides.
pub fn load_config() -> Result<RuntimeConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(RuntimeConfig::default()))
        .merge(Toml::file("/etc/chatwire/chatwire.toml"))
        .merge(Toml::file("chatwire.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no file lookup).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<RuntimeConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(RuntimeConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env overrides.
pub fn load_config_from_path(path: &Path) -> Result<RuntimeConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(RuntimeConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Environment variable provider using explicit `map()` for section-to-dot
/// mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` so key names that
/// themselves contain underscores stay intact: `CHATWIRE_CONTROLLER_WORKERS_PER_QUEUE`
/// must map to `controller.workers_per_queue`, not `controller.workers.per.queue`.
fn env_provider() -> Env {
    Env::prefixed("CHATWIRE_").map(|key| {
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("runtime_", "runtime.", 1)
            .replacen("filter_", "filter.", 1)
            .replacen("controller_", "controller.", 1)
            .replacen("events_", "events.", 1);
        mapped.into()
    })
}
