// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the AccountStore and StorageAdapter traits.

use async_trait::async_trait;

use tally_core::{Account, AccountStatus, AccountStore, HealthStatus, StorageAdapter, TallyError};

use crate::database::{map_tr_err, Database};
use crate::queries;

/// SQLite-backed account store.
///
/// Wraps an already-open [`Database`] handle and delegates every operation to
/// [`queries::accounts`]. The store never opens or closes the database; the
/// handle's owner does.
#[derive(Debug, Clone)]
pub struct SqliteAccountStore {
    db: Database,
}

impl SqliteAccountStore {
    /// Create a store over an open database handle.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Returns the underlying database handle.
    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl StorageAdapter for SqliteAccountStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    async fn health_check(&self) -> Result<HealthStatus, TallyError> {
        let (has_users_table, journal_mode) = self
            .db
            .connection()
            .call(|conn| -> Result<(bool, String), rusqlite::Error> {
                conn.query_row("SELECT 1", [], |_| Ok(()))?;
                let tables: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'users'",
                    [],
                    |row| row.get(0),
                )?;
                let mode: String = conn.query_row("PRAGMA journal_mode", [], |row| row.get(0))?;
                Ok((tables == 1, mode))
            })
            .await
            .map_err(map_tr_err)?;

        if !has_users_table {
            return Ok(HealthStatus::Unhealthy("users table is missing".to_string()));
        }
        // WAL can silently fail to engage, e.g. on filesystems without shared memory.
        if self.db.wal_mode() && !journal_mode.eq_ignore_ascii_case("wal") {
            return Ok(HealthStatus::Degraded(format!(
                "journal mode is `{journal_mode}`, expected `wal`"
            )));
        }
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl AccountStore for SqliteAccountStore {
    async fn create(
        &self,
        username: &str,
        token: &str,
        status: AccountStatus,
    ) -> Result<Account, TallyError> {
        queries::accounts::create_account(&self.db, username, token, status).await
    }

    async fn find_by_token(&self, token: &str) -> Result<Account, TallyError> {
        queries::accounts::find_by_token(&self.db, token).await
    }

    async fn find_by_username(&self, username: &str) -> Result<Account, TallyError> {
        queries::accounts::find_by_username(&self.db, username).await
    }

    async fn increment_count(&self, token: &str, delta: i64) -> Result<(), TallyError> {
        queries::accounts::increment_count(&self.db, token, delta).await
    }

    async fn rotate_token(&self, username: &str, new_token: &str) -> Result<(), TallyError> {
        queries::accounts::rotate_token(&self.db, username, new_token).await
    }
}
