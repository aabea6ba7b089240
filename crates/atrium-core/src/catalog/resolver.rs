//! Public agent catalog resolver.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::catalog::error::{CatalogError, CatalogResult};
use crate::catalog::types::{
    AgentQuery, AgentSource, CategoryFilter, CategorySource, GrantSource, Visibility,
};
use crate::models::{AgentView, CategoryEntry, PermissionBits};

/// Default page size.
pub const DEFAULT_LIMIT: usize = 100;
/// Upper bound on the page size.
pub const MAX_LIMIT: usize = 200;
/// Records inspected by the schema probe.
const SCHEMA_SAMPLE_SIZE: usize = 25;

/// Where public visibility comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisibilityMode {
    /// Public grants in the access-control table (authoritative).
    #[default]
    Grants,
    /// Visibility fields stored on the record itself. Deprecated; only for
    /// deployments that have not migrated to grants.
    LegacyFields,
}

/// Tunables for the resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSettings {
    pub mode: VisibilityMode,
    /// Treat every record as visible. Operational debugging only.
    pub bypass_visibility: bool,
    /// Bits a public grant must carry.
    pub required_permission: PermissionBits,
    pub default_limit: usize,
    pub max_limit: usize,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            mode: VisibilityMode::Grants,
            bypass_visibility: false,
            required_permission: PermissionBits::VIEW,
            default_limit: DEFAULT_LIMIT,
            max_limit: MAX_LIMIT,
        }
    }
}

/// Raw listing parameters as received from a caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListAgentsParams {
    pub query: Option<String>,
    pub category: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Page window after clamping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub offset: usize,
    pub limit: usize,
}

impl Page {
    /// Clamps `limit` into `1..=max_limit` and `offset` to at least zero.
    pub fn clamp(limit: Option<i64>, offset: Option<i64>, settings: &CatalogSettings) -> Self {
        let max = settings.max_limit.max(1) as i64;
        let limit = limit.unwrap_or(settings.default_limit as i64).clamp(1, max) as usize;
        let offset = offset.unwrap_or(0).max(0) as usize;
        Self { offset, limit }
    }
}

/// Counts reported by the admin diagnostics endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogInspection {
    pub mode: VisibilityMode,
    pub bypass_visibility: bool,
    pub total_agents: u64,
    /// Distinct agent ids carrying a qualifying public grant.
    pub public_grants: Option<u64>,
    pub visible_agents: u64,
}

/// Field names observed on stored documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaProbe {
    pub sampled: usize,
    /// Top-level key and the number of sampled documents carrying it.
    pub keys: BTreeMap<String, usize>,
}

/// Resolves which agents anonymous callers may see and lists them.
///
/// Stateless between calls: each operation takes its own snapshot of the
/// sources it reads, so a `Catalog` can be shared freely across tasks.
pub struct Catalog {
    agents: Arc<dyn AgentSource>,
    grants: Arc<dyn GrantSource>,
    categories: Arc<dyn CategorySource>,
    settings: CatalogSettings,
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog")
            .field("agents", &"<AgentSource>")
            .field("grants", &"<GrantSource>")
            .field("categories", &"<CategorySource>")
            .field("settings", &self.settings)
            .finish()
    }
}

impl Catalog {
    /// Creates a catalog over three independent sources.
    pub fn new(
        agents: Arc<dyn AgentSource>,
        grants: Arc<dyn GrantSource>,
        categories: Arc<dyn CategorySource>,
        settings: CatalogSettings,
    ) -> Self {
        if settings.bypass_visibility {
            warn!(
                bypass_visibility = true,
                "Visibility bypass is ON: every agent record will be listed publicly"
            );
        }
        if settings.mode == VisibilityMode::LegacyFields {
            warn!(
                mode = "legacy_fields",
                "Resolving visibility from record fields; the grant table is ignored"
            );
        }
        Self { agents, grants, categories, settings }
    }

    /// Creates a catalog over a single store implementing every source.
    pub fn from_store<S>(store: Arc<S>, settings: CatalogSettings) -> Self
    where
        S: AgentSource + GrantSource + CategorySource + 'static,
    {
        Self::new(store.clone(), store.clone(), store, settings)
    }

    pub fn settings(&self) -> &CatalogSettings {
        &self.settings
    }

    /// Resolves the candidate set. `None` means nothing is visible and the
    /// caller can answer without touching the agent source.
    async fn resolve_visibility(&self) -> CatalogResult<Option<Visibility>> {
        if self.settings.bypass_visibility {
            warn!(bypass_visibility = true, "Serving request with visibility filtering bypassed");
            return Ok(Some(Visibility::All));
        }
        match self.settings.mode {
            VisibilityMode::LegacyFields => Ok(Some(Visibility::LegacyFields)),
            VisibilityMode::Grants => {
                let ids = self.grants.public_agent_ids(self.settings.required_permission).await?;
                debug!(public_agents = ids.len(), "Resolved public grants");
                Ok((!ids.is_empty()).then_some(Visibility::Ids(ids)))
            }
        }
    }

    /// Lists publicly visible agents, newest first.
    pub async fn list_agents(&self, params: &ListAgentsParams) -> CatalogResult<Vec<AgentView>> {
        let Some(visibility) = self.resolve_visibility().await? else {
            return Ok(Vec::new());
        };

        let page = Page::clamp(params.limit, params.offset, &self.settings);
        let query = AgentQuery {
            visibility,
            category: CategoryFilter::from_param(params.category.as_deref()),
            text: AgentQuery::normalize_text(params.query.as_deref()),
            offset: page.offset,
            limit: page.limit,
        };

        let records = self.agents.find_agents(&query).await?;
        debug!(
            returned = records.len(),
            offset = page.offset,
            limit = page.limit,
            category = ?query.category,
            "Listed public agents"
        );
        Ok(records.iter().map(AgentView::from).collect())
    }

    /// Lists the categories present among visible agents.
    ///
    /// Order: `promoted` (only when a visible agent is promoted), `all`,
    /// described categories in descriptor order, then undescribed values
    /// alphabetically with the raw value as label.
    pub async fn list_categories(&self) -> CatalogResult<Vec<CategoryEntry>> {
        let Some(visibility) = self.resolve_visibility().await? else {
            return Ok(vec![CategoryEntry::all()]);
        };

        let summary = self.agents.summarize(&visibility).await?;
        let values: Vec<String> = summary.categories.iter().cloned().collect();
        let descriptors = if values.is_empty() {
            Vec::new()
        } else {
            self.categories.descriptors_for(&values).await?
        };

        let described: BTreeSet<&str> = descriptors.iter().map(|d| d.value.as_str()).collect();
        let undescribed: Vec<CategoryEntry> = values
            .iter()
            .filter(|v| !described.contains(v.as_str()))
            .map(CategoryEntry::raw)
            .collect();

        let mut entries = Vec::with_capacity(values.len() + 2);
        if summary.has_promoted {
            entries.push(CategoryEntry::promoted());
        }
        entries.push(CategoryEntry::all());
        entries.extend(descriptors.into_iter().map(CategoryEntry::from));
        entries.extend(undescribed);
        Ok(entries)
    }

    /// Counts for operators. Never exposed without the admin capability.
    pub async fn inspect(&self) -> CatalogResult<CatalogInspection> {
        let total_agents = self.agents.count(&Visibility::All).await?;
        let (public_grants, visible_agents) = match self.resolve_visibility().await? {
            Some(Visibility::Ids(ids)) => {
                let granted = ids.len() as u64;
                (Some(granted), self.agents.count(&Visibility::Ids(ids)).await?)
            }
            Some(other) => (None, self.agents.count(&other).await?),
            None => (Some(0), 0),
        };
        Ok(CatalogInspection {
            mode: self.settings.mode,
            bypass_visibility: self.settings.bypass_visibility,
            total_agents,
            public_grants,
            visible_agents,
        })
    }

    /// Reports which top-level keys stored documents carry.
    pub async fn probe_schema(&self) -> CatalogResult<SchemaProbe> {
        let sample = self.agents.sample(SCHEMA_SAMPLE_SIZE).await?;
        let mut keys = BTreeMap::new();
        for record in &sample {
            let value = serde_json::to_value(record)
                .map_err(|e| CatalogError::Internal(e.to_string()))?;
            if let Some(object) = value.as_object() {
                for key in object.keys() {
                    *keys.entry(key.clone()).or_insert(0) += 1;
                }
            }
        }
        Ok(SchemaProbe { sampled: sample.len(), keys })
    }
}
