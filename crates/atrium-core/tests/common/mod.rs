//! Shared test utilities for Atrium Core integration tests.
//!
//! Builders for agent records and catalogs, plus store wrappers that count
//! calls or simulate an unreachable backend.

#![allow(dead_code)]

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use atrium_core::catalog::{
    AgentQuery, AgentSource, Catalog, CatalogSettings, CategorySource, CategorySummary,
    GrantSource, Visibility,
};
use atrium_core::models::{AccessGrant, AgentRecord, CategoryDescriptor, PermissionBits};
use atrium_core::storage::{CatalogFixture, InMemoryCatalogStore, StorageError, StorageResult};
use chrono::{DateTime, TimeZone, Utc};

/// Fixed base instant so orderings are deterministic.
pub fn at_minute(minute: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 8, 31, 12, 0, 0).unwrap() + chrono::Duration::minutes(minute)
}

/// Record with a name, a category and an update time.
pub fn agent(id: &str, name: &str, category: Option<&str>, minute: i64) -> AgentRecord {
    let mut record = AgentRecord::new(id, name);
    record.category = category.map(ToString::to_string);
    record.updated_at = Some(at_minute(minute));
    record
}

/// Store holding `records`, each made public with the view bit.
pub fn public_store(records: Vec<AgentRecord>) -> InMemoryCatalogStore {
    let store = InMemoryCatalogStore::new();
    for record in records {
        store.insert_grant(AccessGrant::public_agent(record.id.clone(), PermissionBits::VIEW)).unwrap();
        store.upsert_agent(record).unwrap();
    }
    store
}

/// Catalog with default settings over `store`.
pub fn catalog_over(store: InMemoryCatalogStore) -> Catalog {
    Catalog::from_store(Arc::new(store), CatalogSettings::default())
}

/// A small catalog touching every feature: promoted records, described and
/// undescribed categories, a private record and internal fields.
pub fn sample_fixture() -> CatalogFixture {
    let mut research = agent("a-research", "Research Helper", Some("research"), 50);
    research.description = Some("Finds and summarizes papers".to_string());
    research.promoted = Some(true);
    research.extra.insert("instructions".to_string(), "internal prompt".into());
    research.extra.insert("author".to_string(), "user-17".into());

    let mut writer = agent("a-writer", "Essay Writer", Some("writing"), 40);
    writer.short_description = Some("Drafts long-form prose".to_string());
    writer.tags = Some(vec!["prose".to_string()]);

    let coder = agent("a-coder", "Code Reviewer", Some("code"), 30);
    let misc = agent("a-misc", "Odd Jobs", Some("misc"), 20);
    let uncategorized = agent("a-none", "Nameless", None, 10);
    let private = agent("a-private", "Private Research", Some("research"), 60);

    let public = [&research, &writer, &coder, &misc, &uncategorized];
    let grants = public
        .iter()
        .map(|r| AccessGrant::public_agent(r.id.clone(), PermissionBits::VIEW))
        .collect();

    CatalogFixture {
        agents: vec![research, writer, coder, misc, uncategorized, private],
        grants,
        categories: vec![
            CategoryDescriptor::new("writing", "Writing", 1),
            CategoryDescriptor::new("research", "Research", 2),
            CategoryDescriptor::new("code", "Coding", 3),
        ],
    }
}

/// In-memory store holding [`sample_fixture`].
pub fn sample_store() -> InMemoryCatalogStore {
    sample_fixture().into_memory_store().unwrap()
}

/// Wraps a store and counts calls to the agent source.
pub struct CountingStore {
    inner: InMemoryCatalogStore,
    agent_calls: AtomicUsize,
}

impl CountingStore {
    pub fn new(inner: InMemoryCatalogStore) -> Self {
        Self { inner, agent_calls: AtomicUsize::new(0) }
    }

    pub fn agent_calls(&self) -> usize {
        self.agent_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AgentSource for CountingStore {
    async fn find_agents(&self, query: &AgentQuery) -> StorageResult<Vec<AgentRecord>> {
        self.agent_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.find_agents(query).await
    }

    async fn summarize(&self, visibility: &Visibility) -> StorageResult<CategorySummary> {
        self.agent_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.summarize(visibility).await
    }

    async fn count(&self, visibility: &Visibility) -> StorageResult<u64> {
        self.agent_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.count(visibility).await
    }

    async fn sample(&self, limit: usize) -> StorageResult<Vec<AgentRecord>> {
        self.agent_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.sample(limit).await
    }
}

#[async_trait]
impl GrantSource for CountingStore {
    async fn public_agent_ids(&self, required: PermissionBits) -> StorageResult<BTreeSet<String>> {
        self.inner.public_agent_ids(required).await
    }
}

#[async_trait]
impl CategorySource for CountingStore {
    async fn descriptors_for(&self, values: &[String]) -> StorageResult<Vec<CategoryDescriptor>> {
        self.inner.descriptors_for(values).await
    }
}

/// Wraps a store and stalls every listing for an hour.
pub struct StalledStore {
    inner: InMemoryCatalogStore,
}

impl StalledStore {
    pub fn new(inner: InMemoryCatalogStore) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl AgentSource for StalledStore {
    async fn find_agents(&self, query: &AgentQuery) -> StorageResult<Vec<AgentRecord>> {
        tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
        self.inner.find_agents(query).await
    }

    async fn summarize(&self, visibility: &Visibility) -> StorageResult<CategorySummary> {
        self.inner.summarize(visibility).await
    }

    async fn count(&self, visibility: &Visibility) -> StorageResult<u64> {
        self.inner.count(visibility).await
    }

    async fn sample(&self, limit: usize) -> StorageResult<Vec<AgentRecord>> {
        self.inner.sample(limit).await
    }
}

#[async_trait]
impl GrantSource for StalledStore {
    async fn public_agent_ids(&self, required: PermissionBits) -> StorageResult<BTreeSet<String>> {
        self.inner.public_agent_ids(required).await
    }
}

#[async_trait]
impl CategorySource for StalledStore {
    async fn descriptors_for(&self, values: &[String]) -> StorageResult<Vec<CategoryDescriptor>> {
        self.inner.descriptors_for(values).await
    }
}

/// A store whose backend is unreachable.
pub struct UnavailableStore;

fn offline<T>() -> StorageResult<T> {
    Err(StorageError::Unavailable("connection refused".to_string()))
}

#[async_trait]
impl AgentSource for UnavailableStore {
    async fn find_agents(&self, _: &AgentQuery) -> StorageResult<Vec<AgentRecord>> {
        offline()
    }

    async fn summarize(&self, _: &Visibility) -> StorageResult<CategorySummary> {
        offline()
    }

    async fn count(&self, _: &Visibility) -> StorageResult<u64> {
        offline()
    }

    async fn sample(&self, _: usize) -> StorageResult<Vec<AgentRecord>> {
        offline()
    }
}

#[async_trait]
impl GrantSource for UnavailableStore {
    async fn public_agent_ids(&self, _: PermissionBits) -> StorageResult<BTreeSet<String>> {
        offline()
    }
}

#[async_trait]
impl CategorySource for UnavailableStore {
    async fn descriptors_for(&self, _: &[String]) -> StorageResult<Vec<CategoryDescriptor>> {
        offline()
    }
}
