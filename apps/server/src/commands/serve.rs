//! Serve command implementation.

use std::net::SocketAddr;
use std::path::Path;

use anyhow::Context;
use atrium_core::{Config, logging, server};
use tracing::info;

/// Execute the serve command.
pub async fn execute(config_path: Option<&Path>, address: Option<SocketAddr>) -> anyhow::Result<()> {
    let mut config = Config::load(config_path).context("failed to load configuration")?;
    if let Some(address) = address {
        config.server.address = address;
    }

    logging::init_tracing(&config.logging);
    info!(version = env!("CARGO_PKG_VERSION"), "Starting atrium");

    server::run(&config).await?;
    Ok(())
}
