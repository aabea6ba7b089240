//! Atrium - public, read-only catalog of shared agents.
//!
//! The `atrium` binary serves the catalog over HTTP, imports catalog
//! exports into SQLite, and validates configuration.

mod commands;

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Atrium - public agent catalog
#[derive(Parser, Debug)]
#[command(name = "atrium", author, version, about = "Public, read-only catalog of shared agents")]
struct Args {
    /// Configuration file (TOML). `ATRIUM__*` variables override it.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the catalog over HTTP
    Serve {
        /// Listen address (overrides server.address)
        #[arg(long)]
        address: Option<SocketAddr>,
    },

    /// Load agents, grants and categories from a JSON export into SQLite
    Import {
        /// Fixture file with `agents`, `grants` and `categories` arrays
        fixture: PathBuf,

        /// Database file (overrides storage.database)
        #[arg(long)]
        database: Option<PathBuf>,
    },

    /// Print the effective configuration and exit non-zero if invalid
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = args.config.as_deref();

    match args.command {
        Command::Serve { address } => commands::serve::execute(config, address).await,
        Command::Import { fixture, database } => {
            commands::import::execute(config, &fixture, database)
        }
        Command::CheckConfig => commands::check_config::execute(config),
    }
}
