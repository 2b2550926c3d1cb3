// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait for persistence backends (SQLite, etc.).

use async_trait::async_trait;

use crate::error::TallyError;
use crate::types::HealthStatus;

/// Identity and health of the backend behind an [`AccountStore`](crate::AccountStore).
///
/// Opening and closing the underlying handle is the owner's job; the adapter
/// only reports on a handle it was given.
#[async_trait]
pub trait StorageAdapter: Send + Sync + 'static {
    /// Returns the human-readable name of this backend.
    fn name(&self) -> &str;

    /// Returns the semantic version of this backend implementation.
    fn version(&self) -> semver::Version;

    /// Performs a health check and returns the backend's current status.
    async fn health_check(&self) -> Result<HealthStatus, TallyError>;
}
