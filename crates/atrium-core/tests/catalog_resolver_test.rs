//! Listing and category semantics of the catalog resolver.

mod common;

use std::sync::Arc;

use atrium_core::catalog::{
    Catalog, CatalogError, CatalogSettings, ListAgentsParams, MAX_LIMIT, VisibilityMode,
};
use atrium_core::models::{
    AccessGrant, AgentRecord, Avatar, AvatarFile, PermissionBits, ResourceType,
};
use atrium_core::storage::InMemoryCatalogStore;
use common::{CountingStore, UnavailableStore, agent, catalog_over, public_store, sample_store};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn params() -> ListAgentsParams {
    ListAgentsParams::default()
}

fn ids(views: &[atrium_core::AgentView]) -> Vec<&str> {
    views.iter().map(|v| v.id.as_str()).collect()
}

#[tokio::test]
async fn test_lists_only_granted_agents_newest_first() {
    let catalog = catalog_over(sample_store());
    let agents = catalog.list_agents(&params()).await.unwrap();
    assert_eq!(ids(&agents), vec!["a-research", "a-writer", "a-coder", "a-misc", "a-none"]);
}

#[tokio::test]
async fn test_sanitized_output_has_exactly_whitelisted_keys() {
    let catalog = catalog_over(sample_store());
    let agents = catalog.list_agents(&params()).await.unwrap();

    let value = serde_json::to_value(&agents[0]).unwrap();
    let mut keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
    keys.sort_unstable();
    assert_eq!(
        keys,
        vec!["avatarUrl", "category", "description", "id", "name", "promoted", "tags", "updatedAt"]
    );
    let text = value.to_string();
    assert!(!text.contains("internal prompt"));
    assert!(!text.contains("user-17"));
}

#[tokio::test]
async fn test_view_defaults() {
    let catalog = catalog_over(sample_store());
    let agents = catalog.list_agents(&params()).await.unwrap();

    let writer = agents.iter().find(|a| a.id == "a-writer").unwrap();
    assert_eq!(writer.description, "Drafts long-form prose");
    assert_eq!(writer.tags, vec!["prose".to_string()]);
    assert!(!writer.promoted);

    let nameless = agents.iter().find(|a| a.id == "a-none").unwrap();
    assert_eq!(nameless.category, "General");
    assert!(nameless.tags.is_empty());
    assert_eq!(nameless.avatar_url, "");
}

#[tokio::test]
async fn test_empty_grants_short_circuit_without_reading_records() {
    let store = InMemoryCatalogStore::new();
    store.upsert_agent(agent("a1", "Research Helper", Some("research"), 1)).unwrap();
    store.insert_grant(AccessGrant::public_agent("a1", PermissionBits::EDIT)).unwrap();
    let counting = Arc::new(CountingStore::new(store));
    let catalog = Catalog::from_store(Arc::clone(&counting), CatalogSettings::default());

    let listed = catalog
        .list_agents(&ListAgentsParams {
            query: Some("research".to_string()),
            category: Some("research".to_string()),
            ..params()
        })
        .await
        .unwrap();
    assert!(listed.is_empty());

    let categories = catalog.list_categories().await.unwrap();
    let values: Vec<&str> = categories.iter().map(|c| c.value.as_str()).collect();
    assert_eq!(values, vec!["all"]);
    assert_eq!(categories[0].label, "All");

    assert_eq!(counting.agent_calls(), 0);
}

#[tokio::test]
async fn test_grants_for_other_principals_or_resources_do_not_expose() {
    let store = InMemoryCatalogStore::new();
    store.upsert_agent(agent("a1", "One", None, 1)).unwrap();
    store.upsert_agent(agent("a2", "Two", None, 2)).unwrap();
    let mut user_grant = AccessGrant::public_agent("a1", PermissionBits::VIEW);
    user_grant.principal_type = atrium_core::models::PrincipalType::User;
    user_grant.principal_id = Some("user-1".to_string());
    store.insert_grant(user_grant).unwrap();
    let mut prompt_grant = AccessGrant::public_agent("a2", PermissionBits::VIEW);
    prompt_grant.resource_type = ResourceType::PromptGroup;
    store.insert_grant(prompt_grant).unwrap();

    let catalog = catalog_over(store);
    assert!(catalog.list_agents(&params()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_limit_is_clamped() {
    let records = (0..250).map(|i| agent(&format!("a{i:03}"), "Bulk", None, i)).collect();
    let catalog = catalog_over(public_store(records));

    let big = ListAgentsParams { limit: Some(500), ..params() };
    assert_eq!(catalog.list_agents(&big).await.unwrap().len(), MAX_LIMIT);

    let zero = ListAgentsParams { limit: Some(0), ..params() };
    assert_eq!(catalog.list_agents(&zero).await.unwrap().len(), 1);

    let default = catalog.list_agents(&params()).await.unwrap();
    assert_eq!(default.len(), 100);

    let negative_offset = ListAgentsParams { offset: Some(-10), limit: Some(1), ..params() };
    assert_eq!(ids(&catalog.list_agents(&negative_offset).await.unwrap()), vec!["a249"]);
}

#[tokio::test]
async fn test_categories_order_and_dedup_without_descriptors() {
    let mut promoted = agent("a4", "Star", Some("Code"), 4);
    promoted.featured = Some(true);
    let catalog = catalog_over(public_store(vec![
        agent("a1", "One", Some("Writing"), 1),
        agent("a2", "Two", Some("Code"), 2),
        agent("a3", "Three", Some("Writing"), 3),
        promoted,
    ]));

    let categories = catalog.list_categories().await.unwrap();
    let values: Vec<&str> = categories.iter().map(|c| c.value.as_str()).collect();
    assert_eq!(values, vec!["promoted", "all", "Code", "Writing"]);
    assert_eq!(categories[0].label, "Top Picks");
    assert_eq!(categories[2].label, "Code");
}

#[tokio::test]
async fn test_categories_use_descriptor_order_then_raw_values() {
    let catalog = catalog_over(sample_store());
    let categories = catalog.list_categories().await.unwrap();

    let pairs: Vec<(&str, &str)> =
        categories.iter().map(|c| (c.value.as_str(), c.label.as_str())).collect();
    assert_eq!(
        pairs,
        vec![
            ("promoted", "Top Picks"),
            ("all", "All"),
            ("writing", "Writing"),
            ("research", "Research"),
            ("code", "Coding"),
            ("misc", "misc"),
        ]
    );
}

#[tokio::test]
async fn test_no_promoted_entry_without_promoted_records() {
    let catalog = catalog_over(public_store(vec![agent("a1", "One", Some("x"), 1)]));
    let categories = catalog.list_categories().await.unwrap();
    let values: Vec<&str> = categories.iter().map(|c| c.value.as_str()).collect();
    assert_eq!(values, vec!["all", "x"]);
}

#[tokio::test]
async fn test_text_filter_is_case_insensitive_substring() {
    let catalog = catalog_over(sample_store());
    for q in ["research", "RESEARCH", "Helper", "  summarizes  "] {
        let found = catalog
            .list_agents(&ListAgentsParams { query: Some(q.to_string()), ..params() })
            .await
            .unwrap();
        assert_eq!(ids(&found), vec!["a-research"], "query {q:?}");
    }

    let none = catalog
        .list_agents(&ListAgentsParams { query: Some("xyz".to_string()), ..params() })
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn test_text_filter_searches_short_description() {
    let catalog = catalog_over(sample_store());
    let found = catalog
        .list_agents(&ListAgentsParams { query: Some("long-form".to_string()), ..params() })
        .await
        .unwrap();
    assert_eq!(ids(&found), vec!["a-writer"]);
}

#[tokio::test]
async fn test_category_and_text_filters_combine() {
    let catalog = catalog_over(sample_store());

    let mismatched = ListAgentsParams {
        query: Some("research".to_string()),
        category: Some("writing".to_string()),
        ..params()
    };
    assert!(catalog.list_agents(&mismatched).await.unwrap().is_empty());

    let matched = ListAgentsParams {
        query: Some("research".to_string()),
        category: Some("research".to_string()),
        ..params()
    };
    assert_eq!(ids(&catalog.list_agents(&matched).await.unwrap()), vec!["a-research"]);
}

#[tokio::test]
async fn test_promoted_and_all_category_filters() {
    let catalog = catalog_over(sample_store());

    let promoted = ListAgentsParams { category: Some("promoted".to_string()), ..params() };
    assert_eq!(ids(&catalog.list_agents(&promoted).await.unwrap()), vec!["a-research"]);

    let all = ListAgentsParams { category: Some("all".to_string()), ..params() };
    assert_eq!(catalog.list_agents(&all).await.unwrap().len(), 5);
}

#[tokio::test]
async fn test_avatar_sanitization() {
    let mut file_avatar = agent("a1", "File", None, 3);
    file_avatar.avatar =
        Some(Avatar::File(AvatarFile { filepath: Some("/x.png".to_string()), source: None }));
    let mut url_avatar = agent("a2", "Url", None, 2);
    url_avatar.avatar = Some(Avatar::Url("/y.png".to_string()));
    let no_avatar = agent("a3", "None", None, 1);

    let catalog = catalog_over(public_store(vec![file_avatar, url_avatar, no_avatar]));
    let agents = catalog.list_agents(&params()).await.unwrap();
    let avatars: Vec<&str> = agents.iter().map(|a| a.avatar_url.as_str()).collect();
    assert_eq!(avatars, vec!["/x.png", "/y.png", ""]);
}

#[tokio::test]
async fn test_ties_on_timestamp_break_by_id_descending() {
    let mut untimed = AgentRecord::new("a0", "No timestamp");
    untimed.updated_at = None;
    let catalog = catalog_over(public_store(vec![
        agent("b", "B", None, 5),
        agent("c", "C", None, 5),
        untimed,
        agent("a", "A", None, 5),
    ]));
    let agents = catalog.list_agents(&params()).await.unwrap();
    assert_eq!(ids(&agents), vec!["c", "b", "a", "a0"]);
}

#[tokio::test]
async fn test_unavailable_source_is_service_not_ready() {
    let catalog = Catalog::from_store(Arc::new(UnavailableStore), CatalogSettings::default());

    let listed = catalog.list_agents(&params()).await;
    assert!(matches!(listed, Err(CatalogError::ServiceNotReady(_))));

    let categories = catalog.list_categories().await;
    assert!(matches!(categories, Err(CatalogError::ServiceNotReady(_))));
}

#[tokio::test]
async fn test_bypass_lists_every_record() {
    let settings = CatalogSettings { bypass_visibility: true, ..CatalogSettings::default() };
    let catalog = Catalog::from_store(Arc::new(sample_store()), settings);

    let agents = catalog.list_agents(&params()).await.unwrap();
    assert_eq!(agents.len(), 6);
    assert_eq!(agents[0].id, "a-private");
}

#[tokio::test]
async fn test_legacy_mode_reads_record_fields_and_ignores_grants() {
    let store = InMemoryCatalogStore::new();
    let mut flagged = agent("a1", "Flagged", Some("x"), 3);
    flagged.legacy.is_public = Some(true);
    let mut scoped = agent("a2", "Scoped", Some("y"), 2);
    scoped.legacy.sharing =
        Some(atrium_core::models::VisibilityScope { visibility: Some("public".to_string()) });
    store.upsert_agent(flagged).unwrap();
    store.upsert_agent(scoped).unwrap();
    store.upsert_agent(agent("a3", "Granted only", Some("z"), 1)).unwrap();
    store.insert_grant(AccessGrant::public_agent("a3", PermissionBits::VIEW)).unwrap();

    let settings = CatalogSettings { mode: VisibilityMode::LegacyFields, ..CatalogSettings::default() };
    let catalog = Catalog::from_store(Arc::new(store), settings);

    assert_eq!(ids(&catalog.list_agents(&params()).await.unwrap()), vec!["a1", "a2"]);
    let values: Vec<String> =
        catalog.list_categories().await.unwrap().into_iter().map(|c| c.value).collect();
    assert_eq!(values, vec!["all", "x", "y"]);
}

#[tokio::test]
async fn test_inspect_and_schema_probe() {
    let catalog = catalog_over(sample_store());

    let inspection = catalog.inspect().await.unwrap();
    assert_eq!(inspection.total_agents, 6);
    assert_eq!(inspection.public_grants, Some(5));
    assert_eq!(inspection.visible_agents, 5);
    assert_eq!(inspection.mode, VisibilityMode::Grants);

    let probe = catalog.probe_schema().await.unwrap();
    assert_eq!(probe.sampled, 6);
    assert_eq!(probe.keys.get("id"), Some(&6));
    assert_eq!(probe.keys.get("instructions"), Some(&1));
}

#[tokio::test]
async fn test_inspect_reports_unavailable_source() {
    let catalog = Catalog::from_store(Arc::new(UnavailableStore), CatalogSettings::default());
    assert!(matches!(catalog.inspect().await, Err(CatalogError::ServiceNotReady(_))));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_adjacent_pages_concatenate(
        minutes in prop::collection::vec(0i64..6, 0..40),
        limit in 1i64..12,
        offset in 0i64..30,
    ) {
        let records: Vec<AgentRecord> = minutes
            .iter()
            .enumerate()
            .map(|(i, m)| agent(&format!("a{i:02}"), "Paged", None, *m))
            .collect();
        let catalog = catalog_over(public_store(records));
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();

        let page = |limit: i64, offset: i64| {
            let request = ListAgentsParams { limit: Some(limit), offset: Some(offset), ..params() };
            runtime.block_on(catalog.list_agents(&request)).unwrap()
        };

        let mut joined = page(limit, offset);
        joined.extend(page(limit, offset + limit));
        let double = page(2 * limit, offset);
        prop_assert_eq!(ids(&joined), ids(&double));
    }
}
