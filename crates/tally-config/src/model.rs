// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Tally ledger.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Top-level Tally configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TallyConfig {
    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Caller-side retry policy for counter updates.
    #[serde(default)]
    pub retry: RetryConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file. Relative paths are resolved
    /// against `root`, or the working directory when `root` is unset.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Directory holding the database file. Also settable via `DB_ROOT`.
    #[serde(default)]
    pub root: Option<String>,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,

    /// How long a connection waits on a locked database before failing.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            root: None,
            wal_mode: default_wal_mode(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

impl StorageConfig {
    /// Resolve the database file location.
    ///
    /// An absolute `database_path` wins. Otherwise the path is joined onto
    /// `root`, falling back to the current working directory.
    pub fn resolved_path(&self) -> PathBuf {
        let path = Path::new(&self.database_path);
        if path.is_absolute() {
            return path.to_path_buf();
        }
        match &self.root {
            Some(root) => Path::new(root).join(path),
            None => std::env::current_dir()
                .map(|cwd| cwd.join(path))
                .unwrap_or_else(|_| path.to_path_buf()),
        }
    }
}

/// File name used by existing deployments under `DB_ROOT`.
fn default_database_path() -> String {
    "chat.db".to_string()
}

fn default_wal_mode() -> bool {
    true
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

/// Retry policy applied by callers that re-run a lost compare-and-swap.
///
/// The store itself never retries; this only shapes the operator binary.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    /// Total attempts, including the first one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Pause between attempts in milliseconds.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

fn default_max_attempts() -> u32 {
    5
}

fn default_backoff_ms() -> u64 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_database_path_ignores_root() {
        let config = StorageConfig {
            database_path: "/var/lib/tally/accounts.db".to_string(),
            root: Some("/srv".to_string()),
            ..StorageConfig::default()
        };
        assert_eq!(
            config.resolved_path(),
            PathBuf::from("/var/lib/tally/accounts.db")
        );
    }

    #[test]
    fn relative_database_path_joins_root() {
        let config = StorageConfig {
            root: Some("/srv/data".to_string()),
            ..StorageConfig::default()
        };
        assert_eq!(config.resolved_path(), PathBuf::from("/srv/data/chat.db"));
    }

    #[test]
    fn relative_database_path_without_root_uses_cwd() {
        let config = StorageConfig::default();
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(config.resolved_path(), cwd.join("chat.db"));
    }
}
