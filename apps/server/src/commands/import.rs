//! Import command implementation.

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use atrium_core::storage::{CatalogFixture, SqliteCatalogStore};
use atrium_core::{Config, logging};

/// Execute the import command.
///
/// Writes every record, grant and descriptor of `fixture` into the
/// configured SQLite database in one transaction. Existing rows with the
/// same keys are replaced.
pub fn execute(
    config_path: Option<&Path>,
    fixture: &Path,
    database: Option<PathBuf>,
) -> anyhow::Result<()> {
    let config = Config::load(config_path).context("failed to load configuration")?;
    logging::init_tracing(&config.logging);

    let Some(database) = database.or(config.storage.database) else {
        bail!("no database configured: set storage.database or pass --database");
    };

    let fixture_data = CatalogFixture::load(fixture)
        .with_context(|| format!("failed to read fixture {}", fixture.display()))?;
    let store = SqliteCatalogStore::open(&database.to_string_lossy())
        .with_context(|| format!("failed to open database {}", database.display()))?;
    let summary = store.import(&fixture_data).context("import failed")?;

    println!(
        "Imported {} agents, {} grants, {} categories into {}",
        summary.agents,
        summary.grants,
        summary.categories,
        database.display()
    );
    Ok(())
}
