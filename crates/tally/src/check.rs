// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `tally init` and `tally check` command implementations.
//!
//! Opening the database already applies pending migrations, so `init` only
//! has to report what it opened. `check` runs the storage health probe and
//! fails when the database is not usable.

use tally_core::{HealthStatus, StorageAdapter, TallyError};
use tally_storage::SqliteAccountStore;

/// Report the initialized database.
pub fn run_init(store: &SqliteAccountStore) {
    println!(
        "tally: database ready at {}",
        store.database().path().display()
    );
}

/// Run the storage health check and print the outcome.
pub async fn run_check(store: &SqliteAccountStore) -> Result<(), TallyError> {
    let status = store.health_check().await?;
    let path = store.database().path().display().to_string();
    match status {
        HealthStatus::Healthy => {
            println!("  [OK]   {:<10} {} ({path})", store.name(), store.version());
            Ok(())
        }
        HealthStatus::Degraded(reason) => {
            println!("  [WARN] {:<10} {reason} ({path})", store.name());
            Ok(())
        }
        HealthStatus::Unhealthy(reason) => {
            println!("  [FAIL] {:<10} {reason} ({path})", store.name());
            Err(TallyError::Internal(format!("storage unhealthy: {reason}")))
        }
    }
}
