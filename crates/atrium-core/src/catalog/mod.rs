//! Public agent catalog.
//!
//! Resolves which agent records anonymous callers may see, then lists them
//! or summarizes their categories. Data access goes through the traits in
//! [`types`]; the resolver itself holds no mutable state.

pub mod error;
pub mod resolver;
pub mod types;

pub use error::{CatalogError, CatalogResult};
pub use resolver::{
    Catalog, CatalogInspection, CatalogSettings, DEFAULT_LIMIT, ListAgentsParams, MAX_LIMIT, Page,
    SchemaProbe, VisibilityMode,
};
pub use types::{
    AgentQuery, AgentSource, CategoryFilter, CategorySource, CategorySummary, GrantSource,
    Visibility, listing_order, sort_records,
};
