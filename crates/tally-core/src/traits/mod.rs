// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait seams between the account store and its storage backends.
//!
//! Both traits use `#[async_trait]` so implementations can be held as
//! `Arc<dyn AccountStore>` by callers.

pub mod account;
pub mod storage;

pub use account::AccountStore;
pub use storage::StorageAdapter;
