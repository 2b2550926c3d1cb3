// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./tally.toml` > `~/.config/tally/tally.toml` > `/etc/tally/tally.toml`
//! with the legacy `DB_ROOT` variable and `TALLY_` prefixed overrides on top.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use tracing::debug;

use crate::model::TallyConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/tally/tally.toml` (system-wide)
/// 3. `~/.config/tally/tally.toml` (user XDG config)
/// 4. `./tally.toml` (local directory)
/// 5. `DB_ROOT` (database directory)
/// 6. `TALLY_*` environment variables
pub fn load_config() -> Result<TallyConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<TallyConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(TallyConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<TallyConfig, figment::Error> {
    let figment = Figment::new()
        .merge(Serialized::defaults(TallyConfig::default()))
        .merge(Toml::file(path));
    merge_db_root(figment).merge(env_provider()).extract()
}

/// Build the Figment used internally for config loading.
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    let figment = Figment::new()
        .merge(Serialized::defaults(TallyConfig::default()))
        .merge(Toml::file("/etc/tally/tally.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("tally/tally.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("tally.toml"));
    merge_db_root(figment).merge(env_provider())
}

/// `DB_ROOT` names the directory that holds the database file.
///
/// Read verbatim as a string so numeric directory names survive. An empty
/// value is treated as unset.
fn merge_db_root(figment: Figment) -> Figment {
    match std::env::var("DB_ROOT") {
        Ok(root) if !root.is_empty() => {
            debug!(root = %root, "storage root taken from DB_ROOT");
            figment.merge(Serialized::default("storage.root", root))
        }
        _ => figment,
    }
}

/// Create the `TALLY_` provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `TALLY_STORAGE_BUSY_TIMEOUT_MS` must map to
/// `storage.busy_timeout_ms`, not `storage.busy.timeout.ms`.
fn env_provider() -> Env {
    Env::prefixed("TALLY_").map(|key| {
        key.as_str()
            .to_ascii_lowercase()
            .replacen("log_", "log.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("retry_", "retry.", 1)
            .into()
    })
}
