// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! A [`Database`] wraps one `tokio_rusqlite::Connection`. Every query runs as a
//! closure on that connection's background thread, so statements from
//! concurrent tasks are serialized per handle but may interleave between
//! calls. The compare-and-swap queries in [`crate::queries::accounts`] rely on
//! exactly that: nothing is held between their read and their guarded write.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tally_config::StorageConfig;
use tally_core::TallyError;
use tracing::{debug, info};

use crate::migrations;

const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

/// Convert a tokio-rusqlite error into TallyError::Storage.
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> TallyError {
    TallyError::Storage {
        source: Box::new(e),
    }
}

/// An open, migrated SQLite database.
///
/// Cloning is cheap and yields another handle to the same background
/// connection. The owner opens it once at startup and calls [`Database::close`]
/// on shutdown.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
    path: PathBuf,
    wal_mode: bool,
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.path)
            .field("wal_mode", &self.wal_mode)
            .finish()
    }
}

impl Database {
    /// Open the database at `path` with WAL mode and the default busy timeout.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, TallyError> {
        Self::open_with(path.as_ref().to_path_buf(), true, DEFAULT_BUSY_TIMEOUT).await
    }

    /// Open the database described by a storage configuration section.
    ///
    /// The file location comes from [`StorageConfig::resolved_path`]; missing
    /// parent directories are created.
    pub async fn open_with_config(config: &StorageConfig) -> Result<Self, TallyError> {
        let path = config.resolved_path();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| TallyError::Storage {
                source: Box::new(e),
            })?;
        }
        Self::open_with(
            path,
            config.wal_mode,
            Duration::from_millis(config.busy_timeout_ms),
        )
        .await
    }

    async fn open_with(
        path: PathBuf,
        wal_mode: bool,
        busy_timeout: Duration,
    ) -> Result<Self, TallyError> {
        let conn = tokio_rusqlite::Connection::open(&path)
            .await
            .map_err(|e| TallyError::Storage {
                source: Box::new(e),
            })?;

        conn.call(move |conn| -> Result<(), rusqlite::Error> {
            conn.busy_timeout(busy_timeout)?;
            if wal_mode {
                let _mode: String =
                    conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;
            }
            conn.pragma_update(None, "synchronous", "NORMAL")?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        let applied = conn
            .call(|conn| Ok::<_, rusqlite::Error>(migrations::run_migrations(conn)))
            .await
            .map_err(map_tr_err)??;

        info!(
            path = %path.display(),
            wal_mode,
            migrations_applied = applied,
            "database opened"
        );

        Ok(Self {
            conn,
            path,
            wal_mode,
        })
    }

    /// The underlying tokio-rusqlite connection.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Location of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the handle was opened asking for WAL journaling.
    pub fn wal_mode(&self) -> bool {
        self.wal_mode
    }

    /// Flush the WAL into the main database file. A no-op without WAL mode.
    pub async fn checkpoint(&self) -> Result<(), TallyError> {
        if !self.wal_mode {
            return Ok(());
        }
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(()))
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    /// Checkpoint and close the connection.
    ///
    /// Other clones of this handle fail with a storage error afterwards.
    pub async fn close(self) -> Result<(), TallyError> {
        self.checkpoint().await?;
        self.conn.close().await.map_err(|e| TallyError::Storage {
            source: Box::new(e),
        })?;
        info!(path = %self.path.display(), "database closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn table_names(db: &Database) -> Vec<String> {
        db.connection()
            .call(|conn| -> Result<Vec<String>, rusqlite::Error> {
                let mut stmt = conn
                    .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn open_creates_file_and_users_table() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("open.db");
        let db = Database::open(&db_path).await.unwrap();

        assert!(db_path.exists(), "database file should be created");
        assert_eq!(db.path(), db_path.as_path());
        let tables = table_names(&db).await;
        assert!(tables.iter().any(|t| t == "users"), "tables: {tables:?}");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn open_enables_wal_mode() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("wal.db")).await.unwrap();

        let mode: String = db
            .connection()
            .call(|conn| -> Result<String, rusqlite::Error> {
                conn.query_row("PRAGMA journal_mode", [], |row| row.get(0))
            })
            .await
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn reopening_keeps_schema_and_data() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("reopen.db");

        let db = Database::open(&db_path).await.unwrap();
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "INSERT INTO users (username, token, create_time, update_time)
                     VALUES ('carol', 'tok-c', '2026-01-01T00:00:00.000Z', '2026-01-01T00:00:00.000Z')",
                    [],
                )?;
                Ok(())
            })
            .await
            .unwrap();
        db.close().await.unwrap();

        let db = Database::open(&db_path).await.unwrap();
        let count: i64 = db
            .connection()
            .call(|conn| -> Result<i64, rusqlite::Error> {
                conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            })
            .await
            .unwrap();
        assert_eq!(count, 1);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn open_with_config_resolves_root_and_creates_directories() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("nested/data");
        let config = StorageConfig {
            database_path: "ledger.db".to_string(),
            root: Some(root.display().to_string()),
            wal_mode: false,
            busy_timeout_ms: 100,
        };

        let db = Database::open_with_config(&config).await.unwrap();
        assert_eq!(db.path(), root.join("ledger.db").as_path());
        assert!(root.join("ledger.db").exists());

        // Without WAL mode the checkpoint is skipped.
        db.checkpoint().await.unwrap();
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn closed_handle_reports_storage_error() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("closed.db")).await.unwrap();
        let other = db.clone();
        db.close().await.unwrap();

        let result = other.checkpoint().await;
        assert!(matches!(result, Err(TallyError::Storage { .. })));
    }
}
