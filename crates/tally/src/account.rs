// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `tally account` subcommands.
//!
//! Thin operator wrappers over [`AccountStore`]. The usage command is the
//! caller the store expects: it owns the retry policy for lost
//! compare-and-swap races.

use std::time::Duration;

use clap::{ArgGroup, Subcommand};
use tally_config::RetryConfig;
use tally_core::{Account, AccountStatus, AccountStore, TallyError};
use tracing::{info, warn};

/// Account management subcommands.
#[derive(Subcommand, Debug)]
pub enum AccountCommand {
    /// Create an account. A token is generated when `--token` is omitted.
    Add {
        username: String,
        #[arg(long)]
        token: Option<String>,
        /// One of: disabled, normal, admin.
        #[arg(long, default_value_t = AccountStatus::Normal)]
        status: AccountStatus,
    },
    /// Print an account looked up by username or token.
    #[command(group(ArgGroup::new("key").required(true).args(["username", "token"])))]
    Show {
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        token: Option<String>,
        /// Print the record as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Replace an account's token. A token is generated when `--token` is omitted.
    RotateToken {
        username: String,
        #[arg(long)]
        token: Option<String>,
    },
    /// Add to the usage counter of the account holding `--token`.
    AddUsage {
        #[arg(long)]
        token: String,
        /// Usage to add. Counters only grow, so negative values are rejected.
        #[arg(value_parser = clap::value_parser!(i64).range(0..))]
        delta: i64,
    },
}

/// Generate a fresh access token.
pub fn generate_token() -> String {
    format!("tk-{}", uuid::Uuid::new_v4().simple())
}

/// Run one account subcommand against `store`.
pub async fn run_account(
    command: AccountCommand,
    store: &dyn AccountStore,
    retry: &RetryConfig,
) -> Result<(), TallyError> {
    match command {
        AccountCommand::Add {
            username,
            token,
            status,
        } => {
            let token = token.unwrap_or_else(generate_token);
            let account = store.create(&username, &token, status).await?;
            info!(account_id = account.id, "account created");
            println!("created account {} ({})", account.username, account.id);
            println!("token: {}", account.token);
        }
        AccountCommand::Show {
            username,
            token,
            json,
        } => {
            let account = match (username, token) {
                (Some(username), _) => store.find_by_username(&username).await?,
                (None, Some(token)) => store.find_by_token(&token).await?,
                (None, None) => {
                    return Err(TallyError::Internal(
                        "either --username or --token is required".to_string(),
                    ));
                }
            };
            if json {
                let rendered = serde_json::to_string_pretty(&account)
                    .map_err(|e| TallyError::Internal(e.to_string()))?;
                println!("{rendered}");
            } else {
                print_account(&account);
            }
        }
        AccountCommand::RotateToken { username, token } => {
            let token = token.unwrap_or_else(generate_token);
            store.rotate_token(&username, &token).await?;
            println!("rotated token for {username}");
            println!("token: {token}");
        }
        AccountCommand::AddUsage { token, delta } => {
            let attempts = add_usage_with_retry(store, &token, delta, retry).await?;
            let account = store.find_by_token(&token).await?;
            println!(
                "usage for {} is now {} ({attempts} attempt(s))",
                account.username, account.count
            );
        }
    }
    Ok(())
}

fn print_account(account: &Account) {
    println!("id:          {}", account.id);
    println!("username:    {}", account.username);
    println!("token:       {}", account.token);
    println!("count:       {}", account.count);
    println!("status:      {}", account.status);
    println!("created:     {}", account.create_time);
    println!("updated:     {}", account.update_time);
}

/// Run `increment_count`, re-running it after each lost race.
///
/// Returns the number of attempts used. Gives up with the last
/// `ConcurrentUpdate` once `max_attempts` is reached; any other error is
/// returned immediately. Negative deltas are refused before touching the store.
pub async fn add_usage_with_retry(
    store: &dyn AccountStore,
    token: &str,
    delta: i64,
    policy: &RetryConfig,
) -> Result<u32, TallyError> {
    if delta < 0 {
        return Err(TallyError::Internal(format!(
            "usage delta must not be negative, got {delta}"
        )));
    }
    let mut attempt = 1;
    loop {
        match store.increment_count(token, delta).await {
            Ok(()) => return Ok(attempt),
            Err(e) if e.is_retryable() && attempt < policy.max_attempts => {
                warn!(
                    attempt,
                    max_attempts = policy.max_attempts,
                    error = %e,
                    "usage update lost a race, retrying"
                );
                tokio::time::sleep(Duration::from_millis(policy.backoff_ms)).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;
    use tally_core::LookupKey;

    /// Fails `increment_count` with a conflict a fixed number of times.
    struct FlakyStore {
        conflicts: u32,
        calls: AtomicU32,
        missing: bool,
    }

    impl FlakyStore {
        fn new(conflicts: u32) -> Self {
            Self {
                conflicts,
                calls: AtomicU32::new(0),
                missing: false,
            }
        }
    }

    #[async_trait]
    impl AccountStore for FlakyStore {
        async fn create(
            &self,
            _username: &str,
            _token: &str,
            _status: AccountStatus,
        ) -> Result<Account, TallyError> {
            unimplemented!("not used by retry tests")
        }

        async fn find_by_token(&self, token: &str) -> Result<Account, TallyError> {
            Err(TallyError::NotFound {
                key: LookupKey::Token(token.to_string()),
            })
        }

        async fn find_by_username(&self, username: &str) -> Result<Account, TallyError> {
            Err(TallyError::NotFound {
                key: LookupKey::Username(username.to_string()),
            })
        }

        async fn increment_count(&self, token: &str, _delta: i64) -> Result<(), TallyError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.missing {
                return Err(TallyError::NotFound {
                    key: LookupKey::Token(token.to_string()),
                });
            }
            if call < self.conflicts {
                Err(TallyError::ConcurrentUpdate { account_id: 1 })
            } else {
                Ok(())
            }
        }

        async fn rotate_token(&self, _username: &str, _new_token: &str) -> Result<(), TallyError> {
            unimplemented!("not used by retry tests")
        }
    }

    fn policy(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            backoff_ms: 0,
        }
    }

    #[tokio::test]
    async fn retry_succeeds_after_conflicts() {
        let store = FlakyStore::new(2);
        let attempts = add_usage_with_retry(&store, "tok-1", 3, &policy(5))
            .await
            .unwrap();
        assert_eq!(attempts, 3);
        assert_eq!(store.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retry_gives_up_at_max_attempts() {
        let store = FlakyStore::new(10);
        let err = add_usage_with_retry(&store, "tok-1", 3, &policy(4))
            .await
            .unwrap_err();
        assert!(matches!(err, TallyError::ConcurrentUpdate { .. }));
        assert_eq!(store.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn non_retryable_errors_are_returned_immediately() {
        let store = FlakyStore {
            missing: true,
            ..FlakyStore::new(0)
        };
        let err = add_usage_with_retry(&store, "tok-1", 3, &policy(5))
            .await
            .unwrap_err();
        assert!(matches!(err, TallyError::NotFound { .. }));
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn negative_delta_never_reaches_the_store() {
        let store = FlakyStore::new(0);
        let err = add_usage_with_retry(&store, "tok-1", -7, &policy(5))
            .await
            .unwrap_err();
        assert!(matches!(err, TallyError::Internal(_)));
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn zero_delta_is_accepted() {
        let store = FlakyStore::new(0);
        let attempts = add_usage_with_retry(&store, "tok-1", 0, &policy(5))
            .await
            .unwrap();
        assert_eq!(attempts, 1);
    }

    #[test]
    fn generated_tokens_are_unique_and_prefixed() {
        let a = generate_token();
        let b = generate_token();
        assert!(a.starts_with("tk-"));
        assert_eq!(a.len(), 3 + 32);
        assert_ne!(a, b);
    }
}
