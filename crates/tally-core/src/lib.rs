// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Tally account ledger.
//!
//! This crate provides the error type, the account record types, and the
//! [`AccountStore`] trait that storage backends implement. It has no storage
//! dependencies of its own.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::TallyError;
pub use traits::{AccountStore, StorageAdapter};
pub use types::{Account, AccountStatus, HealthStatus, LookupKey};
