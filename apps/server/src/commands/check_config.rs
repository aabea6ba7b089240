//! Check-config command implementation.

use std::path::Path;

use anyhow::Context;
use atrium_core::Config;

/// Execute the check-config command.
///
/// Prints the merged configuration with secrets masked. Loading already
/// validates, so an invalid configuration surfaces as an error here.
pub fn execute(config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = Config::load(config_path).context("configuration is invalid")?;
    print!("{}", config.to_redacted_toml()?);

    if config.visibility.bypass {
        eprintln!("warning: visibility.bypass is enabled; every agent will be listed publicly");
    }
    Ok(())
}
