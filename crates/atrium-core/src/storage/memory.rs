//! In-memory catalog store.
//!
//! Holds records, grants and descriptors in vectors behind a read-write
//! lock. Query semantics are the reference ones from
//! [`crate::catalog::AgentQuery`], so this store doubles as the oracle the
//! SQLite store is checked against in tests.

use std::collections::BTreeSet;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::catalog::{
    AgentQuery, AgentSource, CategorySource, CategorySummary, GrantSource, Visibility,
    sort_records,
};
use crate::models::{AccessGrant, AgentRecord, CategoryDescriptor, PermissionBits};
use crate::storage::error::{StorageError, StorageResult};

#[derive(Debug, Default)]
struct Contents {
    agents: Vec<AgentRecord>,
    grants: Vec<AccessGrant>,
    categories: Vec<CategoryDescriptor>,
}

/// Catalog store backed by process memory.
#[derive(Debug, Default)]
pub struct InMemoryCatalogStore {
    contents: RwLock<Contents>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a record by id.
    pub fn upsert_agent(&self, record: AgentRecord) -> StorageResult<()> {
        let mut contents = self.write()?;
        contents.agents.retain(|r| r.id != record.id);
        contents.agents.push(record);
        Ok(())
    }

    /// Inserts a grant, replacing an existing one for the same principal and resource.
    pub fn insert_grant(&self, grant: AccessGrant) -> StorageResult<()> {
        let mut contents = self.write()?;
        contents.grants.retain(|g| {
            !(g.principal_type == grant.principal_type
                && g.principal_id == grant.principal_id
                && g.resource_type == grant.resource_type
                && g.resource_id == grant.resource_id)
        });
        contents.grants.push(grant);
        Ok(())
    }

    /// Inserts or replaces a descriptor by value.
    pub fn upsert_category(&self, descriptor: CategoryDescriptor) -> StorageResult<()> {
        let mut contents = self.write()?;
        contents.categories.retain(|d| d.value != descriptor.value);
        contents.categories.push(descriptor);
        Ok(())
    }

    fn read(&self) -> StorageResult<std::sync::RwLockReadGuard<'_, Contents>> {
        self.contents.read().map_err(|_| StorageError::Unavailable("store lock poisoned".to_string()))
    }

    fn write(&self) -> StorageResult<std::sync::RwLockWriteGuard<'_, Contents>> {
        self.contents
            .write()
            .map_err(|_| StorageError::Unavailable("store lock poisoned".to_string()))
    }
}

#[async_trait]
impl AgentSource for InMemoryCatalogStore {
    async fn find_agents(&self, query: &AgentQuery) -> StorageResult<Vec<AgentRecord>> {
        let contents = self.read()?;
        let mut matched: Vec<AgentRecord> =
            contents.agents.iter().filter(|r| query.matches(r)).cloned().collect();
        sort_records(&mut matched);
        Ok(matched.into_iter().skip(query.offset).take(query.limit).collect())
    }

    async fn summarize(&self, visibility: &Visibility) -> StorageResult<CategorySummary> {
        let contents = self.read()?;
        let mut summary = CategorySummary::default();
        contents.agents.iter().filter(|r| visibility.admits(r)).for_each(|r| summary.observe(r));
        Ok(summary)
    }

    async fn count(&self, visibility: &Visibility) -> StorageResult<u64> {
        let contents = self.read()?;
        Ok(contents.agents.iter().filter(|r| visibility.admits(r)).count() as u64)
    }

    async fn sample(&self, limit: usize) -> StorageResult<Vec<AgentRecord>> {
        let contents = self.read()?;
        let mut all = contents.agents.clone();
        sort_records(&mut all);
        all.truncate(limit);
        Ok(all)
    }
}

#[async_trait]
impl GrantSource for InMemoryCatalogStore {
    async fn public_agent_ids(&self, required: PermissionBits) -> StorageResult<BTreeSet<String>> {
        let contents = self.read()?;
        Ok(contents
            .grants
            .iter()
            .filter(|g| g.exposes_agent(required))
            .map(|g| g.resource_id.clone())
            .collect())
    }
}

#[async_trait]
impl CategorySource for InMemoryCatalogStore {
    async fn descriptors_for(&self, values: &[String]) -> StorageResult<Vec<CategoryDescriptor>> {
        let contents = self.read()?;
        let mut found: Vec<CategoryDescriptor> = contents
            .categories
            .iter()
            .filter(|d| d.is_active && values.contains(&d.value))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.value.cmp(&b.value)));
        Ok(found)
    }
}
