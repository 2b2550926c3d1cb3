// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Account types shared by the store trait and its implementations.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Health status reported by storage health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Backend is fully operational.
    Healthy,
    /// Backend is operational but experiencing issues.
    Degraded(String),
    /// Backend is not operational.
    Unhealthy(String),
}

/// Account status as persisted in the `status` column.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Disabled,
    #[default]
    Normal,
    Admin,
}

impl AccountStatus {
    /// Integer code stored in the database.
    pub fn code(self) -> i64 {
        match self {
            AccountStatus::Disabled => 0,
            AccountStatus::Normal => 1,
            AccountStatus::Admin => 2,
        }
    }
}

/// A stored status code with no matching [`AccountStatus`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unknown account status code {0}")]
pub struct UnknownStatus(pub i64);

impl TryFrom<i64> for AccountStatus {
    type Error = UnknownStatus;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(AccountStatus::Disabled),
            1 => Ok(AccountStatus::Normal),
            2 => Ok(AccountStatus::Admin),
            other => Err(UnknownStatus(other)),
        }
    }
}

/// A single row of the `users` table.
///
/// Timestamps are ISO 8601 UTC strings with millisecond precision, as written
/// by the storage-side clock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub username: String,
    pub token: String,
    /// Accumulated usage (e.g. billed model tokens).
    pub count: i64,
    pub status: AccountStatus,
    pub create_time: String,
    pub update_time: String,
}

/// The unique key an account was looked up by.
///
/// `Display` never prints token values, so the key is safe to embed in
/// error messages and log lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupKey {
    Username(String),
    Token(String),
}

impl fmt::Display for LookupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupKey::Username(name) => write!(f, "username `{name}`"),
            LookupKey::Token(_) => f.write_str("token [REDACTED]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn status_codes_match_schema() {
        assert_eq!(AccountStatus::Disabled.code(), 0);
        assert_eq!(AccountStatus::Normal.code(), 1);
        assert_eq!(AccountStatus::Admin.code(), 2);
        assert_eq!(AccountStatus::try_from(2), Ok(AccountStatus::Admin));
        assert_eq!(AccountStatus::try_from(3), Err(UnknownStatus(3)));
        assert_eq!(AccountStatus::try_from(-1), Err(UnknownStatus(-1)));
    }

    #[test]
    fn status_parses_from_cli_names() {
        assert_eq!(AccountStatus::from_str("admin").unwrap(), AccountStatus::Admin);
        assert_eq!(AccountStatus::from_str("Normal").unwrap(), AccountStatus::Normal);
        assert!(AccountStatus::from_str("root").is_err());
        assert_eq!(AccountStatus::Disabled.to_string(), "disabled");
    }

    #[test]
    fn default_status_is_normal() {
        assert_eq!(AccountStatus::default(), AccountStatus::Normal);
    }

    #[test]
    fn account_serializes_status_by_name() {
        let account = Account {
            id: 1,
            username: "alice".into(),
            token: "tok-1".into(),
            count: 0,
            status: AccountStatus::Admin,
            create_time: "2026-01-01T00:00:00.000Z".into(),
            update_time: "2026-01-01T00:00:00.000Z".into(),
        };
        let json = serde_json::to_value(&account).unwrap();
        assert_eq!(json["status"], "admin");
    }
}
