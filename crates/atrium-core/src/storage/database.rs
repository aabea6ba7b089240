//! Database connection and schema management.

use rusqlite::Connection;
use rusqlite::functions::FunctionFlags;
use tracing::info;

use crate::storage::error::StorageResult;

/// Name of the Unicode-aware lowercase SQL function.
pub const UNICODE_LOWER: &str = "unicode_lower";

/// Database connection wrapper.
///
/// Manages the SQLite connection and schema initialization.
pub struct Database {
    conn: Connection,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").field("path", &self.conn.path()).finish()
    }
}

impl Database {
    /// Opens a database connection at the specified path.
    ///
    /// # Errors
    /// * `StorageError::Connection` - If the database connection fails
    pub fn open(path: &str) -> StorageResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.register_functions()?;
        db.init_schema()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// # Errors
    /// * `StorageError::Connection` - If the database connection fails
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.register_functions()?;
        db.init_schema()?;
        Ok(db)
    }

    /// Gets a reference to the underlying connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Gets a mutable reference to the underlying connection.
    pub fn conn_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    /// Registers SQL functions the catalog queries rely on.
    ///
    /// `unicode_lower(text)` folds case the way Rust's `str::to_lowercase`
    /// does. SQLite's built-in `lower()` only folds ASCII.
    fn register_functions(&self) -> StorageResult<()> {
        self.conn.create_scalar_function(
            UNICODE_LOWER,
            1,
            FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
            |ctx| Ok(ctx.get::<Option<String>>(0)?.map(|text| text.to_lowercase())),
        )?;
        Ok(())
    }

    /// Creates the catalog tables. Safe to run against an existing database.
    fn init_schema(&self) -> StorageResult<()> {
        info!("Initializing database schema");

        // Scalar columns are copies of document fields used for filtering and
        // ordering; `document_json` is the source of truth for everything else.
        self.conn.execute(
            r"
            CREATE TABLE IF NOT EXISTS agents (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT,
                short_description TEXT,
                category TEXT,
                promoted INTEGER NOT NULL DEFAULT 0,
                legacy_public INTEGER NOT NULL DEFAULT 0,
                updated_at TEXT,
                document_json TEXT NOT NULL
            )
            ",
            [],
        )?;

        self.conn.execute(
            r"
            CREATE TABLE IF NOT EXISTS access_grants (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                principal_type TEXT NOT NULL,
                principal_id TEXT NOT NULL DEFAULT '',
                resource_type TEXT NOT NULL,
                resource_id TEXT NOT NULL,
                perm_bits INTEGER NOT NULL,
                UNIQUE (principal_type, principal_id, resource_type, resource_id)
            )
            ",
            [],
        )?;

        self.conn.execute(
            r"
            CREATE TABLE IF NOT EXISTS agent_categories (
                value TEXT PRIMARY KEY,
                label TEXT NOT NULL,
                description TEXT,
                display_order INTEGER NOT NULL DEFAULT 0,
                is_active INTEGER NOT NULL DEFAULT 1
            )
            ",
            [],
        )?;

        self.conn.execute(
            r"
            CREATE TABLE IF NOT EXISTS rate_limit_windows (
                key TEXT PRIMARY KEY,
                window_start_ms INTEGER NOT NULL,
                count INTEGER NOT NULL
            )
            ",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_agents_updated_at ON agents(updated_at DESC, id DESC)",
            [],
        )?;

        self.conn
            .execute("CREATE INDEX IF NOT EXISTS idx_agents_category ON agents(category)", [])?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_access_grants_lookup ON access_grants(principal_type, resource_type)",
            [],
        )?;

        info!("Database schema initialized successfully");
        Ok(())
    }

    /// Executes a function within a transaction.
    ///
    /// # Errors
    /// * `StorageError::Connection` - If the transaction fails
    pub fn transaction<F, R>(&mut self, f: F) -> StorageResult<R>
    where
        F: FnOnce(&rusqlite::Transaction) -> StorageResult<R>,
    {
        let tx = self.conn.transaction()?;
        match f(&tx) {
            Ok(result) => {
                tx.commit()?;
                Ok(result)
            }
            Err(e) => {
                tx.rollback()?;
                Err(e)
            }
        }
    }
}
