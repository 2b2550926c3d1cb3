// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tally - operator CLI for the account ledger.
//!
//! This is the binary entry point. It loads configuration, opens the
//! database, runs one command, and closes the database on every exit path.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod account;
mod check;
mod shutdown;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tally_config::TallyConfig;
use tally_core::TallyError;
use tally_storage::{Database, SqliteAccountStore};
use tracing::{debug, error, info};

use crate::account::AccountCommand;

/// Tally - account records, tokens and usage counters.
#[derive(Parser, Debug)]
#[command(name = "tally", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the XDG hierarchy.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the database file and apply migrations.
    Init,
    /// Verify that the database is reachable and migrated.
    Check,
    /// Manage accounts.
    Account {
        #[command(subcommand)]
        action: AccountCommand,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => tally_config::load_and_validate_path(path),
        None => tally_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            tally_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.log.level);

    if let Err(e) = run(cli.command, &config).await {
        error!(error = %e, "command failed");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

/// Open the database, run `command` against it, then close it.
///
/// The command is raced against the shutdown signal; whichever finishes
/// first, the database handle is closed before returning.
async fn run(command: Commands, config: &TallyConfig) -> Result<(), TallyError> {
    let db = Database::open_with_config(&config.storage).await?;
    let store = SqliteAccountStore::new(db.clone());
    let cancel = shutdown::install_signal_handler();

    let outcome = tokio::select! {
        result = dispatch(command, &store, config) => result,
        _ = cancel.cancelled() => {
            info!("shutdown requested, abandoning command");
            Err(TallyError::Internal("interrupted".to_string()))
        }
    };

    drop(store);
    let closed = db.close().await;
    debug!("database handle released");
    outcome.and(closed)
}

async fn dispatch(
    command: Commands,
    store: &SqliteAccountStore,
    config: &TallyConfig,
) -> Result<(), TallyError> {
    match command {
        Commands::Init => {
            check::run_init(store);
            Ok(())
        }
        Commands::Check => check::run_check(store).await,
        Commands::Account { action } => account::run_account(action, store, &config.retry).await,
    }
}

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` wins over the configured level. Output goes to stderr so that
/// command output on stdout stays machine-readable.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "tally={log_level},tally_storage={log_level},tally_config={log_level},warn"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
