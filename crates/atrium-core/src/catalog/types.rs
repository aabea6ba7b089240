//! Query types and the data-source seams the catalog reads through.
//!
//! The catalog never talks to a concrete store. It resolves visibility,
//! builds an [`AgentQuery`] and hands filtering, ordering and windowing to
//! an [`AgentSource`]. Every source must apply the semantics documented on
//! [`AgentQuery::matches`] and [`sort_records`].

use std::cmp::Ordering;
use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::models::{AgentRecord, CategoryDescriptor, PermissionBits};
use crate::storage::StorageResult;

/// Which records are candidates before any other filter applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Visibility {
    /// Every record (visibility bypass).
    All,
    /// Records whose id is in the set, as resolved from public grants.
    Ids(BTreeSet<String>),
    /// Records whose own legacy visibility fields mark them public.
    LegacyFields,
}

impl Visibility {
    pub fn admits(&self, record: &AgentRecord) -> bool {
        match self {
            Self::All => true,
            Self::Ids(ids) => ids.contains(&record.id),
            Self::LegacyFields => record.is_legacy_public(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Ids(_) => "grants",
            Self::LegacyFields => "legacy_fields",
        }
    }
}

/// Category restriction requested by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryFilter {
    /// No restriction (`category` absent or `"all"`).
    Any,
    /// Only promoted records.
    Promoted,
    /// Exact match on the stored category value.
    Exact(String),
}

impl CategoryFilter {
    /// Interprets the raw `category` query parameter.
    pub fn from_param(raw: Option<&str>) -> Self {
        match raw {
            None | Some("" | crate::models::ALL_CATEGORY) => Self::Any,
            Some(crate::models::PROMOTED_CATEGORY) => Self::Promoted,
            Some(other) => Self::Exact(other.to_string()),
        }
    }

    pub fn admits(&self, record: &AgentRecord) -> bool {
        match self {
            Self::Any => true,
            Self::Promoted => record.is_promoted(),
            Self::Exact(value) => record.category.as_deref() == Some(value.as_str()),
        }
    }
}

/// A fully resolved listing request handed to an [`AgentSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentQuery {
    pub visibility: Visibility,
    pub category: CategoryFilter,
    /// Lowercased, trimmed, non-empty search text.
    pub text: Option<String>,
    pub offset: usize,
    pub limit: usize,
}

impl AgentQuery {
    /// Normalizes free text into the form sources expect.
    pub fn normalize_text(raw: Option<&str>) -> Option<String> {
        raw.map(str::trim).filter(|t| !t.is_empty()).map(str::to_lowercase)
    }

    /// Visibility AND category AND text.
    pub fn matches(&self, record: &AgentRecord) -> bool {
        self.visibility.admits(record)
            && self.category.admits(record)
            && self.text.as_deref().is_none_or(|needle| record.matches_text(needle))
    }
}

/// Listing order: `updatedAt` descending, then id descending. Records
/// without a timestamp sort last.
pub fn listing_order(a: &AgentRecord, b: &AgentRecord) -> Ordering {
    b.updated_at.cmp(&a.updated_at).then_with(|| b.id.cmp(&a.id))
}

/// Sorts records in listing order.
pub fn sort_records(records: &mut [AgentRecord]) {
    records.sort_by(listing_order);
}

/// What the categories endpoint needs to know about the visible set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategorySummary {
    /// Distinct non-empty category values.
    pub categories: BTreeSet<String>,
    pub has_promoted: bool,
}

impl CategorySummary {
    pub fn observe(&mut self, record: &AgentRecord) {
        if let Some(category) = record.category_value() {
            self.categories.insert(category.to_string());
        }
        self.has_promoted |= record.is_promoted();
    }
}

/// Read access to agent records.
#[async_trait]
pub trait AgentSource: Send + Sync {
    /// Returns the page of records matching `query`, in listing order.
    async fn find_agents(&self, query: &AgentQuery) -> StorageResult<Vec<AgentRecord>>;

    /// Summarizes categories and the promoted flag over the visible set.
    async fn summarize(&self, visibility: &Visibility) -> StorageResult<CategorySummary>;

    /// Counts records admitted by `visibility`.
    async fn count(&self, visibility: &Visibility) -> StorageResult<u64>;

    /// Returns up to `limit` raw records in listing order, for diagnostics.
    async fn sample(&self, limit: usize) -> StorageResult<Vec<AgentRecord>>;
}

/// Read access to the access-control grant table.
#[async_trait]
pub trait GrantSource: Send + Sync {
    /// Ids of agents carrying a public grant whose bits include `required`.
    async fn public_agent_ids(&self, required: PermissionBits) -> StorageResult<BTreeSet<String>>;
}

/// Read access to curated category descriptors.
#[async_trait]
pub trait CategorySource: Send + Sync {
    /// Active descriptors for the given values, in declared display order.
    async fn descriptors_for(&self, values: &[String]) -> StorageResult<Vec<CategoryDescriptor>>;
}
