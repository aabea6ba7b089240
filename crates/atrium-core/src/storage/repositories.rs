//! SQLite implementation of the catalog data sources.
//!
//! Agent documents are stored whole in `document_json`; the scalar columns
//! next to them exist so filtering and ordering run inside SQLite.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::SecondsFormat;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter};
use tracing::{debug, info};

use crate::catalog::{
    AgentQuery, AgentSource, CategoryFilter, CategorySource, CategorySummary, GrantSource,
    Visibility,
};
use crate::models::{
    AccessGrant, AgentRecord, CategoryDescriptor, PermissionBits, PrincipalType, ResourceType,
};
use crate::storage::database::Database;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::fixture::{CatalogFixture, ImportSummary};

// ============================================================================
// Query Building Helpers
// ============================================================================

/// Accumulates `WHERE` conditions with their positional parameters.
#[derive(Debug, Default)]
struct WhereClause {
    conditions: Vec<String>,
    params: Vec<SqlValue>,
}

impl WhereClause {
    fn push(&mut self, condition: &str, params: impl IntoIterator<Item = SqlValue>) {
        self.conditions.push(condition.to_string());
        self.params.extend(params);
    }

    fn visibility(&mut self, visibility: &Visibility) -> StorageResult<()> {
        match visibility {
            Visibility::All => {}
            Visibility::Ids(ids) => {
                let json = serde_json::to_string(ids)?;
                self.push("id IN (SELECT j.value FROM json_each(?) AS j)", [SqlValue::Text(json)]);
            }
            Visibility::LegacyFields => self.push("legacy_public = 1", []),
        }
        Ok(())
    }

    fn category(&mut self, filter: &CategoryFilter) {
        match filter {
            CategoryFilter::Any => {}
            CategoryFilter::Promoted => self.push("promoted = 1", []),
            CategoryFilter::Exact(value) => {
                self.push("category = ?", [SqlValue::Text(value.clone())]);
            }
        }
    }

    fn text(&mut self, needle: Option<&str>) {
        if let Some(needle) = needle {
            let p = || SqlValue::Text(needle.to_string());
            self.push(
                "(instr(unicode_lower(name), ?) > 0 \
                 OR instr(unicode_lower(COALESCE(description, '')), ?) > 0 \
                 OR instr(unicode_lower(COALESCE(short_description, '')), ?) > 0)",
                [p(), p(), p()],
            );
        }
    }

    fn sql(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.conditions.join(" AND "))
        }
    }
}

fn decode_document(json: &str) -> StorageResult<AgentRecord> {
    Ok(serde_json::from_str(json)?)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

// ============================================================================
// SQLite Catalog Store
// ============================================================================

/// SQLite implementation of the agent, grant and category sources.
#[derive(Debug, Clone)]
pub struct SqliteCatalogStore {
    db: Arc<Mutex<Database>>,
}

impl SqliteCatalogStore {
    /// Creates a store that owns `db`.
    pub fn new(db: Database) -> Self {
        Self { db: Arc::new(Mutex::new(db)) }
    }

    /// Creates a store over a database shared with other components.
    pub fn from_shared(db: Arc<Mutex<Database>>) -> Self {
        Self { db }
    }

    /// Opens (and initializes) the database at `path`.
    pub fn open(path: &str) -> StorageResult<Self> {
        Ok(Self::new(Database::open(path)?))
    }

    /// Shared handle to the underlying database.
    pub fn database(&self) -> Arc<Mutex<Database>> {
        Arc::clone(&self.db)
    }

    fn lock_db(&self) -> StorageResult<MutexGuard<'_, Database>> {
        self.db.lock().map_err(|_| StorageError::Unavailable("database lock poisoned".to_string()))
    }

    /// Inserts or replaces an agent document.
    pub fn upsert_agent(&self, record: &AgentRecord) -> StorageResult<()> {
        if record.id.is_empty() {
            return Err(StorageError::InvalidData("agent id cannot be empty".to_string()));
        }
        let db = self.lock_db()?;
        Self::write_agent(db.conn(), record)?;
        debug!(agent_id = %record.id, "Upserted agent");
        Ok(())
    }

    /// Inserts a grant, replacing the bits of an existing one for the same
    /// principal and resource.
    pub fn insert_grant(&self, grant: &AccessGrant) -> StorageResult<()> {
        let db = self.lock_db()?;
        Self::write_grant(db.conn(), grant)?;
        debug!(
            principal_type = grant.principal_type.as_str(),
            resource_id = %grant.resource_id,
            perm_bits = grant.perm_bits.bits(),
            "Stored access grant"
        );
        Ok(())
    }

    /// Inserts or replaces a category descriptor.
    pub fn upsert_category(&self, descriptor: &CategoryDescriptor) -> StorageResult<()> {
        let db = self.lock_db()?;
        Self::write_category(db.conn(), descriptor)?;
        Ok(())
    }

    /// Loads a fixture in a single transaction.
    pub fn import(&self, fixture: &CatalogFixture) -> StorageResult<ImportSummary> {
        let mut db = self.lock_db()?;
        let summary = db.transaction(|tx| {
            for record in &fixture.agents {
                if record.id.is_empty() {
                    return Err(StorageError::InvalidData("agent id cannot be empty".to_string()));
                }
                Self::write_agent(tx, record)?;
            }
            for grant in &fixture.grants {
                Self::write_grant(tx, grant)?;
            }
            for descriptor in &fixture.categories {
                Self::write_category(tx, descriptor)?;
            }
            Ok(fixture.summary())
        })?;
        info!(
            agents = summary.agents,
            grants = summary.grants,
            categories = summary.categories,
            "Imported catalog fixture"
        );
        Ok(summary)
    }

    fn write_agent(conn: &rusqlite::Connection, record: &AgentRecord) -> StorageResult<()> {
        let document = serde_json::to_string(record)?;
        let updated_at =
            record.updated_at.map(|ts| ts.to_rfc3339_opts(SecondsFormat::Micros, true));
        conn.execute(
            "INSERT INTO agents (id, name, description, short_description, category, promoted, legacy_public, updated_at, document_json) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9) \
             ON CONFLICT(id) DO UPDATE SET name = excluded.name, description = excluded.description, \
             short_description = excluded.short_description, category = excluded.category, \
             promoted = excluded.promoted, legacy_public = excluded.legacy_public, \
             updated_at = excluded.updated_at, document_json = excluded.document_json",
            params![
                record.id,
                record.name,
                record.description,
                record.short_description,
                non_empty(record.category.as_deref()),
                record.is_promoted(),
                record.is_legacy_public(),
                updated_at,
                document
            ],
        )?;
        Ok(())
    }

    fn write_grant(conn: &rusqlite::Connection, grant: &AccessGrant) -> StorageResult<()> {
        conn.execute(
            "INSERT INTO access_grants (principal_type, principal_id, resource_type, resource_id, perm_bits) \
             VALUES (?1, ?2, ?3, ?4, ?5) \
             ON CONFLICT(principal_type, principal_id, resource_type, resource_id) \
             DO UPDATE SET perm_bits = excluded.perm_bits",
            params![
                grant.principal_type.as_str(),
                grant.principal_id.as_deref().unwrap_or(""),
                grant.resource_type.as_str(),
                grant.resource_id,
                i64::from(grant.perm_bits.bits())
            ],
        )?;
        Ok(())
    }

    fn write_category(
        conn: &rusqlite::Connection,
        descriptor: &CategoryDescriptor,
    ) -> StorageResult<()> {
        conn.execute(
            "INSERT INTO agent_categories (value, label, description, display_order, is_active) \
             VALUES (?1, ?2, ?3, ?4, ?5) \
             ON CONFLICT(value) DO UPDATE SET label = excluded.label, description = excluded.description, \
             display_order = excluded.display_order, is_active = excluded.is_active",
            params![
                descriptor.value,
                descriptor.label,
                descriptor.description,
                descriptor.order,
                descriptor.is_active
            ],
        )?;
        Ok(())
    }

    fn query_documents(
        &self,
        sql: &str,
        params: &[SqlValue],
    ) -> StorageResult<Vec<AgentRecord>> {
        let db = self.lock_db()?;
        let mut stmt = db.conn().prepare(sql)?;
        let documents = stmt
            .query_map(params_from_iter(params.iter()), |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        documents.iter().map(|d| decode_document(d)).collect()
    }
}

#[async_trait]
impl AgentSource for SqliteCatalogStore {
    async fn find_agents(&self, query: &AgentQuery) -> StorageResult<Vec<AgentRecord>> {
        let mut clause = WhereClause::default();
        clause.visibility(&query.visibility)?;
        clause.category(&query.category);
        clause.text(query.text.as_deref());

        let sql = format!(
            "SELECT document_json FROM agents{} ORDER BY updated_at DESC, id DESC LIMIT ? OFFSET ?",
            clause.sql()
        );
        let mut params = clause.params;
        params.push(SqlValue::Integer(query.limit as i64));
        params.push(SqlValue::Integer(query.offset as i64));
        self.query_documents(&sql, &params)
    }

    async fn summarize(&self, visibility: &Visibility) -> StorageResult<CategorySummary> {
        let mut clause = WhereClause::default();
        clause.visibility(visibility)?;
        let where_sql = clause.sql();
        let joiner = if where_sql.is_empty() { " WHERE" } else { " AND" };

        let db = self.lock_db()?;
        let mut stmt = db.conn().prepare(&format!(
            "SELECT DISTINCT category FROM agents{where_sql}{joiner} category IS NOT NULL AND category <> ''"
        ))?;
        let categories = stmt
            .query_map(params_from_iter(clause.params.iter()), |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<BTreeSet<_>, _>>()?;

        let has_promoted: bool = db.conn().query_row(
            &format!("SELECT EXISTS(SELECT 1 FROM agents{where_sql}{joiner} promoted = 1)"),
            params_from_iter(clause.params.iter()),
            |row| row.get(0),
        )?;

        Ok(CategorySummary { categories, has_promoted })
    }

    async fn count(&self, visibility: &Visibility) -> StorageResult<u64> {
        let mut clause = WhereClause::default();
        clause.visibility(visibility)?;
        let db = self.lock_db()?;
        let count: i64 = db.conn().query_row(
            &format!("SELECT COUNT(*) FROM agents{}", clause.sql()),
            params_from_iter(clause.params.iter()),
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u64)
    }

    async fn sample(&self, limit: usize) -> StorageResult<Vec<AgentRecord>> {
        self.query_documents(
            "SELECT document_json FROM agents ORDER BY updated_at DESC, id DESC LIMIT ?",
            &[SqlValue::Integer(limit as i64)],
        )
    }
}

#[async_trait]
impl GrantSource for SqliteCatalogStore {
    async fn public_agent_ids(&self, required: PermissionBits) -> StorageResult<BTreeSet<String>> {
        let db = self.lock_db()?;
        let mut stmt = db.conn().prepare(
            "SELECT DISTINCT resource_id FROM access_grants \
             WHERE principal_type = ?1 AND resource_type = ?2 AND (perm_bits & ?3) = ?3",
        )?;
        let ids = stmt
            .query_map(
                params![
                    PrincipalType::Public.as_str(),
                    ResourceType::Agent.as_str(),
                    i64::from(required.bits())
                ],
                |row| row.get::<_, String>(0),
            )?
            .collect::<std::result::Result<BTreeSet<_>, _>>()?;
        Ok(ids)
    }
}

#[async_trait]
impl CategorySource for SqliteCatalogStore {
    async fn descriptors_for(&self, values: &[String]) -> StorageResult<Vec<CategoryDescriptor>> {
        let json = serde_json::to_string(values)?;
        let db = self.lock_db()?;
        let mut stmt = db.conn().prepare(
            "SELECT value, label, description, display_order, is_active FROM agent_categories \
             WHERE is_active = 1 AND value IN (SELECT j.value FROM json_each(?1) AS j) \
             ORDER BY display_order, value",
        )?;
        let descriptors = stmt
            .query_map(params![json], |row| {
                Ok(CategoryDescriptor {
                    value: row.get(0)?,
                    label: row.get(1)?,
                    description: row.get(2)?,
                    order: row.get(3)?,
                    is_active: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(descriptors)
    }
}
