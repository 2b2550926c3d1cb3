// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The account store contract.

use async_trait::async_trait;

use crate::error::TallyError;
use crate::types::{Account, AccountStatus};

/// Access to the single-table account ledger.
///
/// Implementations hold no mutable state between calls and perform no
/// caching, so any number of tasks may share one store. Mutations use
/// optimistic concurrency: a lost race is reported as
/// [`TallyError::ConcurrentUpdate`] and is never retried internally.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Inserts a new account with a zero usage counter.
    ///
    /// Fails with [`TallyError::DuplicateKey`] when the username or token is
    /// already taken.
    async fn create(
        &self,
        username: &str,
        token: &str,
        status: AccountStatus,
    ) -> Result<Account, TallyError>;

    /// Looks up an account by its access token.
    async fn find_by_token(&self, token: &str) -> Result<Account, TallyError>;

    /// Looks up an account by its username.
    async fn find_by_username(&self, username: &str) -> Result<Account, TallyError>;

    /// Adds `delta` to the usage counter of the account holding `token`.
    ///
    /// Reads the current counter, then writes `count + delta` only if the
    /// counter still holds the value that was read.
    async fn increment_count(&self, token: &str, delta: i64) -> Result<(), TallyError>;

    /// Replaces the token of `username` with `new_token`.
    ///
    /// The write is guarded on the token value that was read, so a rotation
    /// racing another rotation fails with [`TallyError::ConcurrentUpdate`].
    /// A token owned by another account fails with
    /// [`TallyError::TokenCollision`].
    async fn rotate_token(&self, username: &str, new_token: &str) -> Result<(), TallyError>;
}
