//! JSON fixtures used to seed a catalog store.
//!
//! Records and grants are owned by the chat application; fixtures exist so
//! an operator can stand up a catalog from an export, and so tests can
//! describe a catalog in one document.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::models::{AccessGrant, AgentRecord, CategoryDescriptor};
use crate::storage::error::StorageResult;
use crate::storage::memory::InMemoryCatalogStore;

/// Agents, grants and category descriptors in one document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogFixture {
    #[serde(default)]
    pub agents: Vec<AgentRecord>,
    #[serde(default)]
    pub grants: Vec<AccessGrant>,
    #[serde(default)]
    pub categories: Vec<CategoryDescriptor>,
}

/// Counts of what an import wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub agents: usize,
    pub grants: usize,
    pub categories: usize,
}

impl CatalogFixture {
    /// Reads a fixture from a JSON file.
    pub fn load(path: &Path) -> StorageResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> StorageResult<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn summary(&self) -> ImportSummary {
        ImportSummary {
            agents: self.agents.len(),
            grants: self.grants.len(),
            categories: self.categories.len(),
        }
    }

    /// Builds an in-memory store holding the fixture.
    pub fn into_memory_store(self) -> StorageResult<InMemoryCatalogStore> {
        let store = InMemoryCatalogStore::new();
        for record in self.agents {
            store.upsert_agent(record)?;
        }
        for grant in self.grants {
            store.insert_grant(grant)?;
        }
        for descriptor in self.categories {
            store.upsert_category(descriptor)?;
        }
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_sections_are_optional() {
        let fixture = CatalogFixture::from_json(r#"{"agents": [{"id": "a1", "name": "A"}]}"#).unwrap();
        assert_eq!(fixture.summary(), ImportSummary { agents: 1, grants: 0, categories: 0 });
    }

    #[test]
    fn test_fixture_load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = CatalogFixture::load(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, crate::storage::StorageError::Io(_)));
    }
}
