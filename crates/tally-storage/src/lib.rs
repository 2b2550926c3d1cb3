// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Tally account ledger.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, an explicitly
//! owned [`Database`] handle built on `tokio-rusqlite`, and the
//! [`SqliteAccountStore`] with its optimistic compare-and-swap mutations.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;

pub use adapter::SqliteAccountStore;
pub use database::Database;
pub use models::*;
