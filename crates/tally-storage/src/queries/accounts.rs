// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Account operations on the `users` table.
//!
//! Lookups and inserts take one round-trip. The two mutations take two: a
//! snapshot read, then a write guarded by an equality predicate on the
//! snapshot. A guarded write that changes no rows means another writer got
//! there first, which is reported as [`TallyError::ConcurrentUpdate`].

use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension};
use tally_core::TallyError;
use tracing::debug;

use crate::database::{map_tr_err, Database};
use crate::models::{Account, AccountStatus, LookupKey};

/// Map a `SELECT id, username, token, count, status, create_time, update_time` row.
fn account_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Account> {
    let code: i64 = row.get(4)?;
    let status = AccountStatus::try_from(code)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Integer, Box::new(e)))?;
    Ok(Account {
        id: row.get(0)?,
        username: row.get(1)?,
        token: row.get(2)?,
        count: row.get(3)?,
        status,
        create_time: row.get(5)?,
        update_time: row.get(6)?,
    })
}

/// The column behind a UNIQUE constraint failure, if `err` is one.
fn unique_violation(err: &rusqlite::Error) -> Option<&'static str> {
    match err {
        rusqlite::Error::SqliteFailure(e, msg)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            let msg = msg.as_deref().unwrap_or_default();
            if msg.contains("users.username") {
                Some("username")
            } else if msg.contains("users.token") {
                Some("token")
            } else {
                Some("unknown")
            }
        }
        _ => None,
    }
}

/// Insert a new account with a zero counter and storage-clock timestamps.
pub async fn create_account(
    db: &Database,
    username: &str,
    token: &str,
    status: AccountStatus,
) -> Result<Account, TallyError> {
    let username = username.to_string();
    let token = token.to_string();
    let account = db
        .connection()
        .call(move |conn| {
            let inserted = conn.query_row(
                "INSERT INTO users (username, token, status, create_time, update_time)
                 VALUES (?1, ?2, ?3,
                         strftime('%Y-%m-%dT%H:%M:%fZ', 'now'),
                         strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
                 RETURNING id, username, token, count, status, create_time, update_time",
                params![username, token, status.code()],
                account_from_row,
            );
            match inserted {
                Ok(account) => Ok(Ok(account)),
                Err(e) => match unique_violation(&e) {
                    Some(field) => Ok(Err(TallyError::DuplicateKey { field })),
                    None => Err(e),
                },
            }
        })
        .await
        .map_err(map_tr_err)??;

    debug!(account_id = account.id, status = %account.status, "account created");
    Ok(account)
}

/// Fetch the full record matching a unique key.
pub async fn find_account(db: &Database, key: LookupKey) -> Result<Account, TallyError> {
    let (sql, value) = match &key {
        LookupKey::Username(username) => (
            "SELECT id, username, token, count, status, create_time, update_time
             FROM users WHERE username = ?1",
            username.clone(),
        ),
        LookupKey::Token(token) => (
            "SELECT id, username, token, count, status, create_time, update_time
             FROM users WHERE token = ?1",
            token.clone(),
        ),
    };
    let found = db
        .connection()
        .call(move |conn| {
            let mut stmt = conn.prepare_cached(sql)?;
            stmt.query_row(params![value], account_from_row).optional()
        })
        .await
        .map_err(map_tr_err)?;
    found.ok_or(TallyError::NotFound { key })
}

/// Get an account by access token.
pub async fn find_by_token(db: &Database, token: &str) -> Result<Account, TallyError> {
    find_account(db, LookupKey::Token(token.to_string())).await
}

/// Get an account by username.
pub async fn find_by_username(db: &Database, username: &str) -> Result<Account, TallyError> {
    find_account(db, LookupKey::Username(username.to_string())).await
}

/// The counter value a guarded write is conditioned on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CountSnapshot {
    pub account_id: i64,
    pub count: i64,
}

pub(crate) async fn read_count(db: &Database, token: &str) -> Result<CountSnapshot, TallyError> {
    let lookup = token.to_string();
    let found = db
        .connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT id, count FROM users WHERE token = ?1",
                params![lookup],
                |row| {
                    Ok(CountSnapshot {
                        account_id: row.get(0)?,
                        count: row.get(1)?,
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)?;
    found.ok_or_else(|| TallyError::NotFound {
        key: LookupKey::Token(token.to_string()),
    })
}

/// Write `new_count` only if the row still holds the snapshot's count.
///
/// Returns whether the row was updated.
pub(crate) async fn compare_and_set_count(
    db: &Database,
    snapshot: CountSnapshot,
    new_count: i64,
) -> Result<bool, TallyError> {
    let changed = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE users
                 SET count = ?1,
                     update_time = MAX(strftime('%Y-%m-%dT%H:%M:%fZ', 'now'),
                                       strftime('%Y-%m-%dT%H:%M:%fZ', update_time, '+0.001 seconds'))
                 WHERE id = ?2 AND count = ?3",
                params![new_count, snapshot.account_id, snapshot.count],
            )
        })
        .await
        .map_err(map_tr_err)?;
    Ok(changed == 1)
}

/// Add `delta` to the usage counter of the account holding `token`.
///
/// Never retries: a lost race surfaces as [`TallyError::ConcurrentUpdate`]
/// and the caller decides whether to run the whole operation again.
pub async fn increment_count(db: &Database, token: &str, delta: i64) -> Result<(), TallyError> {
    let snapshot = read_count(db, token).await?;
    let new_count = snapshot.count.checked_add(delta).ok_or_else(|| {
        TallyError::Internal(format!(
            "usage counter overflow on account {}",
            snapshot.account_id
        ))
    })?;

    if !compare_and_set_count(db, snapshot, new_count).await? {
        return Err(TallyError::ConcurrentUpdate {
            account_id: snapshot.account_id,
        });
    }

    debug!(
        account_id = snapshot.account_id,
        delta,
        count = new_count,
        "usage counter updated"
    );
    Ok(())
}

/// The token value a guarded rotation is conditioned on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TokenSnapshot {
    pub account_id: i64,
    pub token: String,
}

pub(crate) async fn read_token(db: &Database, username: &str) -> Result<TokenSnapshot, TallyError> {
    let lookup = username.to_string();
    let found = db
        .connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT id, token FROM users WHERE username = ?1",
                params![lookup],
                |row| {
                    Ok(TokenSnapshot {
                        account_id: row.get(0)?,
                        token: row.get(1)?,
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)?;
    found.ok_or_else(|| TallyError::NotFound {
        key: LookupKey::Username(username.to_string()),
    })
}

/// Replace the token only if the row still holds the snapshot's token.
///
/// Returns whether the row was updated, or [`TallyError::TokenCollision`]
/// when `new_token` belongs to another account.
pub(crate) async fn compare_and_set_token(
    db: &Database,
    snapshot: &TokenSnapshot,
    new_token: &str,
) -> Result<bool, TallyError> {
    let account_id = snapshot.account_id;
    let expected = snapshot.token.clone();
    let new_token = new_token.to_string();
    db.connection()
        .call(move |conn| {
            let updated = conn.execute(
                "UPDATE users
                 SET token = ?1,
                     update_time = MAX(strftime('%Y-%m-%dT%H:%M:%fZ', 'now'),
                                       strftime('%Y-%m-%dT%H:%M:%fZ', update_time, '+0.001 seconds'))
                 WHERE id = ?2 AND token = ?3",
                params![new_token, account_id, expected],
            );
            match updated {
                Ok(changed) => Ok(Ok(changed == 1)),
                Err(e) if unique_violation(&e).is_some() => Ok(Err(TallyError::TokenCollision)),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)?
}

/// Replace the access token of `username`.
///
/// The write is conditioned on the token read in the same call, so of two
/// racing rotations at most one succeeds.
pub async fn rotate_token(db: &Database, username: &str, new_token: &str) -> Result<(), TallyError> {
    let snapshot = read_token(db, username).await?;
    if !compare_and_set_token(db, &snapshot, new_token).await? {
        return Err(TallyError::ConcurrentUpdate {
            account_id: snapshot.account_id,
        });
    }

    debug!(account_id = snapshot.account_id, "access token rotated");
    Ok(())
}
