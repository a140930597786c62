//! Storage Connection Management
//!
//! Connection and schema initialization for the embedded libsql database
//! holding database blocks and their rows.
//!
//! # Database Connection Patterns
//!
//! **Always use `connect_with_timeout()` in async functions.** The Tokio
//! runtime moves futures between threads, and the 5-second busy timeout lets
//! concurrent operations wait and retry instead of failing immediately with
//! `SQLITE_BUSY`.
//!
//! Schema initialization is idempotent (`CREATE TABLE IF NOT EXISTS`), so
//! opening the same file twice is safe.

use crate::db::error::StoreError;
use libsql::Builder;
use std::path::PathBuf;
use std::sync::Arc;

/// Storage engine owning the libsql handle and schema
///
/// # Examples
///
/// ```no_run
/// use tabular_core::db::Storage;
/// use std::path::PathBuf;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let storage = Storage::new(PathBuf::from("./data/tabular.db")).await?;
///     let conn = storage.connect_with_timeout().await?;
///     # let _ = conn;
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Storage {
    /// libsql database handle (wrapped in Arc for sharing)
    pub db: Arc<libsql::Database>,

    /// Path to the database file
    pub db_path: PathBuf,
}

impl Storage {
    /// Open (or create) the database file at `db_path` and initialize the
    /// schema.
    ///
    /// Creates the parent directory when missing, enables WAL mode and
    /// foreign keys, and checkpoints the WAL for freshly created files so
    /// the schema is on disk before the first concurrent open.
    pub async fn new(db_path: PathBuf) -> Result<Self, StoreError> {
        let is_new_database = !db_path.exists();

        if let Some(parent) = db_path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let db = Builder::new_local(&db_path)
            .build()
            .await
            .map_err(|e| StoreError::connection_failed(db_path.clone(), e))?;

        let storage = Self {
            db: Arc::new(db),
            db_path,
        };

        storage.initialize_schema(is_new_database).await?;

        Ok(storage)
    }

    /// Get a connection handle.
    ///
    /// Prefer [`Self::connect_with_timeout`] in async code; this variant
    /// skips the busy-timeout pragma.
    pub fn connect(&self) -> Result<libsql::Connection, StoreError> {
        self.db
            .connect()
            .map_err(|e| StoreError::connection_failed(self.db_path.clone(), e))
    }

    /// Get a connection with a 5-second busy timeout set.
    ///
    /// This is the default choice: the timeout makes concurrent writers
    /// wait on each other instead of surfacing `SQLITE_BUSY`.
    pub async fn connect_with_timeout(&self) -> Result<libsql::Connection, StoreError> {
        let conn = self.connect()?;
        self.execute_pragma(&conn, "PRAGMA busy_timeout = 5000")
            .await?;
        Ok(conn)
    }

    /// Execute a PRAGMA statement.
    ///
    /// PRAGMA statements return rows, so query() is required over execute().
    async fn execute_pragma(
        &self,
        conn: &libsql::Connection,
        pragma: &str,
    ) -> Result<(), StoreError> {
        let mut stmt = conn
            .prepare(pragma)
            .await
            .map_err(|e| StoreError::sql(format!("failed to execute '{}': {}", pragma, e)))?;
        let _ = stmt
            .query(())
            .await
            .map_err(|e| StoreError::sql(format!("failed to execute '{}': {}", pragma, e)))?;
        Ok(())
    }

    /// Create tables and indexes, idempotently.
    ///
    /// # Schema
    ///
    /// - `databases`: schema containers; the ordered property list lives in
    ///   a single JSON column and is rewritten whole on every schema change
    /// - `database_rows`: rows with their JSON property map, opaque content
    ///   payload, and the position key that orders them
    ///
    /// Soft deletion is a `deleted_at` timestamp on both tables; every read
    /// path filters on it.
    async fn initialize_schema(&self, is_new_database: bool) -> Result<(), StoreError> {
        let conn = self.connect_with_timeout().await?;

        // WAL mode for better concurrency between readers and writers
        self.execute_pragma(&conn, "PRAGMA journal_mode = WAL")
            .await?;
        self.execute_pragma(&conn, "PRAGMA busy_timeout = 5000")
            .await?;
        self.execute_pragma(&conn, "PRAGMA foreign_keys = ON")
            .await?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS databases (
                id TEXT PRIMARY KEY,
                slug_id TEXT NOT NULL UNIQUE,
                title TEXT,
                icon TEXT,
                properties JSON NOT NULL DEFAULT '[]',
                view_config JSON NOT NULL DEFAULT '{}',
                page_id TEXT,
                space_id TEXT NOT NULL,
                workspace_id TEXT NOT NULL,
                creator_id TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                deleted_at DATETIME
            )",
            (),
        )
        .await
        .map_err(|e| StoreError::sql(format!("failed to create databases table: {}", e)))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS database_rows (
                id TEXT PRIMARY KEY,
                slug_id TEXT NOT NULL UNIQUE,
                position TEXT NOT NULL,
                properties JSON NOT NULL DEFAULT '{}',
                title TEXT,
                icon TEXT,
                content JSON,
                database_id TEXT NOT NULL,
                space_id TEXT NOT NULL,
                workspace_id TEXT NOT NULL,
                creator_id TEXT,
                last_updated_by_id TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                deleted_at DATETIME,
                FOREIGN KEY (database_id) REFERENCES databases(id) ON DELETE CASCADE
            )",
            (),
        )
        .await
        .map_err(|e| StoreError::sql(format!("failed to create database_rows table: {}", e)))?;

        self.create_indexes(&conn).await?;

        // Flush the WAL for brand-new files so rapid reopen (tests swap
        // database files quickly) never observes a missing schema.
        if is_new_database {
            self.execute_pragma(&conn, "PRAGMA wal_checkpoint(TRUNCATE)")
                .await?;
        }

        Ok(())
    }

    async fn create_indexes(&self, conn: &libsql::Connection) -> Result<(), StoreError> {
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_databases_page_id ON databases(page_id)",
            (),
        )
        .await
        .map_err(|e| StoreError::sql(format!("failed to create page index: {}", e)))?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_databases_workspace_id ON databases(workspace_id)",
            (),
        )
        .await
        .map_err(|e| StoreError::sql(format!("failed to create workspace index: {}", e)))?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_database_rows_database_id
             ON database_rows(database_id)",
            (),
        )
        .await
        .map_err(|e| StoreError::sql(format!("failed to create row database index: {}", e)))?;

        // position is the hot ordering column for every list query
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_database_rows_position
             ON database_rows(database_id, position)",
            (),
        )
        .await
        .map_err(|e| StoreError::sql(format!("failed to create row position index: {}", e)))?;

        Ok(())
    }
}
