// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain model types for storage entities.
//!
//! The canonical types live in `tally-core::types` so the [`AccountStore`]
//! trait can name them. This module re-exports them for use within the
//! storage crate.
//!
//! [`AccountStore`]: tally_core::AccountStore

pub use tally_core::types::{Account, AccountStatus, LookupKey};
