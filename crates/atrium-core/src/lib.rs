//! Atrium Core - public, read-only catalog of shared agents.
//!
//! This crate provides:
//! - Visibility resolution over access grants (or deprecated record fields)
//! - Filtered, paginated listings and category summaries
//! - SQLite and in-memory storage
//! - An axum HTTP surface with rate limiting and admin diagnostics
//!
//! # Example
//!
//! ```rust,no_run
//! use atrium_core::{config::Config, server};
//!
//! #[tokio::main]
//! async fn main() -> atrium_core::Result<()> {
//!     let config = Config::load(None)?;
//!     atrium_core::logging::init_tracing(&config.logging);
//!     server::run(&config).await
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod ratelimit;
pub mod server;
pub mod storage;

pub use catalog::{Catalog, CatalogError, CatalogSettings, ListAgentsParams, VisibilityMode};
pub use config::{Config, ConfigError};
pub use error::{AtriumError, Result};
pub use models::{AccessGrant, AgentRecord, AgentView, CategoryDescriptor, CategoryEntry};
pub use ratelimit::{RateLimitStore, RateLimiter};
pub use server::{AppState, build_state, router};
pub use storage::{
    CatalogFixture, Database, InMemoryCatalogStore, SqliteCatalogStore, StorageError,
};
