// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Tally account ledger.

use thiserror::Error;

use crate::types::LookupKey;

/// The primary error type used across the account store and its collaborators.
#[derive(Debug, Error)]
pub enum TallyError {
    /// Storage backend errors (database connection, query failure, row decoding).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// No account matches the lookup key.
    #[error("account not found: {key}")]
    NotFound { key: LookupKey },

    /// An insert violated a uniqueness constraint on the named column.
    #[error("duplicate key: an account with this {field} already exists")]
    DuplicateKey { field: &'static str },

    /// A compare-and-swap write lost a race against another writer.
    ///
    /// The caller may re-read and retry the whole read-modify-write sequence.
    #[error("concurrent update detected on account {account_id}")]
    ConcurrentUpdate { account_id: i64 },

    /// The rotation target token already belongs to another account.
    #[error("token already belongs to another account")]
    TokenCollision,

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl TallyError {
    /// Returns true when re-running the failed read-modify-write may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TallyError::ConcurrentUpdate { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_concurrent_update_is_retryable() {
        assert!(TallyError::ConcurrentUpdate { account_id: 7 }.is_retryable());
        assert!(!TallyError::TokenCollision.is_retryable());
        assert!(!TallyError::DuplicateKey { field: "token" }.is_retryable());
        assert!(
            !TallyError::NotFound {
                key: LookupKey::Username("bob".into())
            }
            .is_retryable()
        );
    }

    #[test]
    fn not_found_message_redacts_token() {
        let err = TallyError::NotFound {
            key: LookupKey::Token("tok-secret".into()),
        };
        let msg = err.to_string();
        assert!(!msg.contains("tok-secret"), "token leaked: {msg}");
        assert!(msg.contains("token"));

        let err = TallyError::NotFound {
            key: LookupKey::Username("alice".into()),
        };
        assert_eq!(err.to_string(), "account not found: username `alice`");
    }
}
