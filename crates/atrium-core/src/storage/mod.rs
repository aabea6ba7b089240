//! Storage layer for the catalog.
//!
//! SQLite persistence for deployments, an in-memory store for fixtures and
//! tests, and JSON fixtures to seed either.

pub mod database;
pub mod error;
pub mod fixture;
pub mod memory;
pub mod repositories;

pub use database::Database;
pub use error::{StorageError, StorageResult};
pub use fixture::{CatalogFixture, ImportSummary};
pub use memory::InMemoryCatalogStore;
pub use repositories::SqliteCatalogStore;
