//! Database Store - SQL operations for schema containers
//!
//! Persistence for the `databases` table. The ordered property list is one
//! JSON column, read and rewritten whole on every schema mutation; callers
//! that need read-modify-write atomicity pass a shared connection holding an
//! open transaction (see the service layer).

use crate::db::convert::{parse_opt_timestamp, parse_timestamp};
use crate::db::error::StoreError;
use crate::db::storage::Storage;
use crate::models::{Database, NewDatabase, PropertyDefinition};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

const DATABASE_COLUMNS: &str = "id, slug_id, title, icon, properties, view_config, page_id, \
     space_id, workspace_id, creator_id, created_at, updated_at, deleted_at";

/// SQL CRUD over the `databases` table.
///
/// Every method accepts an optional connection; `None` acquires a fresh one,
/// `Some` joins whatever transaction the caller has open on it.
#[derive(Debug, Clone)]
pub struct DatabaseStore {
    storage: Arc<Storage>,
}

impl DatabaseStore {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    async fn conn_or(
        &self,
        conn: Option<&libsql::Connection>,
    ) -> Result<libsql::Connection, StoreError> {
        match conn {
            Some(conn) => Ok(conn.clone()),
            None => self.storage.connect_with_timeout().await,
        }
    }

    /// Insert a new database and return it as stored.
    ///
    /// The id is assigned here; timestamps come from the database defaults.
    /// A slug collision surfaces as [`StoreError::UniqueViolation`].
    pub async fn insert(
        &self,
        database: &NewDatabase,
        conn: Option<&libsql::Connection>,
    ) -> Result<Database, StoreError> {
        let conn = self.conn_or(conn).await?;
        let id = Uuid::new_v4().to_string();
        let properties = serde_json::to_string(&database.properties)
            .map_err(|e| StoreError::corrupt(format!("unserializable properties: {}", e)))?;

        conn.execute(
            "INSERT INTO databases (id, slug_id, title, icon, properties, page_id, space_id, workspace_id, creator_id)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            (
                id.as_str(),
                database.slug_id.as_str(),
                database.title.as_deref(),
                database.icon.as_deref(),
                properties.as_str(),
                database.page_id.as_deref(),
                database.space_id.as_str(),
                database.workspace_id.as_str(),
                database.creator_id.as_deref(),
            ),
        )
        .await
        .map_err(|e| StoreError::from_insert("failed to insert database", e))?;

        self.find_by_id(&id, Some(&conn))
            .await?
            .ok_or_else(|| StoreError::sql("database missing after insert"))
    }

    /// Get a live database by id; tombstoned databases are not found
    pub async fn find_by_id(
        &self,
        database_id: &str,
        conn: Option<&libsql::Connection>,
    ) -> Result<Option<Database>, StoreError> {
        let conn = self.conn_or(conn).await?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM databases WHERE id = ? AND deleted_at IS NULL",
                DATABASE_COLUMNS
            ))
            .await
            .map_err(|e| StoreError::sql(format!("failed to prepare database query: {}", e)))?;

        let mut rows = stmt
            .query([database_id])
            .await
            .map_err(|e| StoreError::sql(format!("failed to query database: {}", e)))?;

        match rows.next().await.map_err(|e| StoreError::sql(e.to_string()))? {
            Some(row) => Ok(Some(row_to_database(&row)?)),
            None => Ok(None),
        }
    }

    /// Get a live database by its slug identifier
    pub async fn find_by_slug(
        &self,
        slug_id: &str,
        conn: Option<&libsql::Connection>,
    ) -> Result<Option<Database>, StoreError> {
        let conn = self.conn_or(conn).await?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM databases WHERE slug_id = ? AND deleted_at IS NULL",
                DATABASE_COLUMNS
            ))
            .await
            .map_err(|e| StoreError::sql(format!("failed to prepare database query: {}", e)))?;

        let mut rows = stmt
            .query([slug_id])
            .await
            .map_err(|e| StoreError::sql(format!("failed to query database: {}", e)))?;

        match rows.next().await.map_err(|e| StoreError::sql(e.to_string()))? {
            Some(row) => Ok(Some(row_to_database(&row)?)),
            None => Ok(None),
        }
    }

    /// List the live databases embedded in a page
    pub async fn find_by_page(
        &self,
        page_id: &str,
        workspace_id: &str,
        conn: Option<&libsql::Connection>,
    ) -> Result<Vec<Database>, StoreError> {
        let conn = self.conn_or(conn).await?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM databases
                 WHERE page_id = ? AND workspace_id = ? AND deleted_at IS NULL
                 ORDER BY created_at ASC",
                DATABASE_COLUMNS
            ))
            .await
            .map_err(|e| StoreError::sql(format!("failed to prepare page query: {}", e)))?;

        let mut rows = stmt
            .query([page_id, workspace_id])
            .await
            .map_err(|e| StoreError::sql(format!("failed to query page databases: {}", e)))?;

        let mut databases = Vec::new();
        while let Some(row) = rows.next().await.map_err(|e| StoreError::sql(e.to_string()))? {
            databases.push(row_to_database(&row)?);
        }
        Ok(databases)
    }

    /// Update title, icon and view configuration.
    ///
    /// Callers pass the complete new values (merge happens in the service).
    pub async fn update(
        &self,
        database_id: &str,
        title: Option<&str>,
        icon: Option<&str>,
        view_config: &Value,
        conn: Option<&libsql::Connection>,
    ) -> Result<(), StoreError> {
        let conn = self.conn_or(conn).await?;
        let view_config = serde_json::to_string(view_config)
            .map_err(|e| StoreError::corrupt(format!("unserializable view config: {}", e)))?;
        conn.execute(
            "UPDATE databases
             SET title = ?, icon = ?, view_config = ?, updated_at = CURRENT_TIMESTAMP
             WHERE id = ?",
            (title, icon, view_config.as_str(), database_id),
        )
        .await
        .map_err(|e| StoreError::sql(format!("failed to update database: {}", e)))?;
        Ok(())
    }

    /// Rewrite the whole property list
    pub async fn update_properties(
        &self,
        database_id: &str,
        properties: &[PropertyDefinition],
        conn: Option<&libsql::Connection>,
    ) -> Result<(), StoreError> {
        let conn = self.conn_or(conn).await?;
        let properties = serde_json::to_string(properties)
            .map_err(|e| StoreError::corrupt(format!("unserializable properties: {}", e)))?;
        conn.execute(
            "UPDATE databases
             SET properties = ?, updated_at = CURRENT_TIMESTAMP
             WHERE id = ?",
            (properties.as_str(), database_id),
        )
        .await
        .map_err(|e| StoreError::sql(format!("failed to update properties: {}", e)))?;
        Ok(())
    }

    /// Tombstone a database
    pub async fn soft_delete(
        &self,
        database_id: &str,
        conn: Option<&libsql::Connection>,
    ) -> Result<(), StoreError> {
        let conn = self.conn_or(conn).await?;
        conn.execute(
            "UPDATE databases SET deleted_at = CURRENT_TIMESTAMP
             WHERE id = ? AND deleted_at IS NULL",
            [database_id],
        )
        .await
        .map_err(|e| StoreError::sql(format!("failed to soft delete database: {}", e)))?;
        Ok(())
    }

    /// Permanently remove a database; returns rows affected (0 = already gone)
    pub async fn hard_delete(
        &self,
        database_id: &str,
        conn: Option<&libsql::Connection>,
    ) -> Result<u64, StoreError> {
        let conn = self.conn_or(conn).await?;
        conn.execute("DELETE FROM databases WHERE id = ?", [database_id])
            .await
            .map_err(|e| StoreError::sql(format!("failed to delete database: {}", e)))
    }
}

/// Convert a libsql row to a [`Database`]; columns per `DATABASE_COLUMNS`
fn row_to_database(row: &libsql::Row) -> Result<Database, StoreError> {
    let id: String = row
        .get(0)
        .map_err(|e| StoreError::corrupt(format!("database id: {}", e)))?;
    let slug_id: String = row
        .get(1)
        .map_err(|e| StoreError::corrupt(format!("database slug_id: {}", e)))?;
    let title: Option<String> = row
        .get(2)
        .map_err(|e| StoreError::corrupt(format!("database title: {}", e)))?;
    let icon: Option<String> = row
        .get(3)
        .map_err(|e| StoreError::corrupt(format!("database icon: {}", e)))?;
    let properties_json: String = row
        .get(4)
        .map_err(|e| StoreError::corrupt(format!("database properties: {}", e)))?;
    let view_config_json: String = row
        .get(5)
        .map_err(|e| StoreError::corrupt(format!("database view_config: {}", e)))?;
    let page_id: Option<String> = row
        .get(6)
        .map_err(|e| StoreError::corrupt(format!("database page_id: {}", e)))?;
    let space_id: String = row
        .get(7)
        .map_err(|e| StoreError::corrupt(format!("database space_id: {}", e)))?;
    let workspace_id: String = row
        .get(8)
        .map_err(|e| StoreError::corrupt(format!("database workspace_id: {}", e)))?;
    let creator_id: Option<String> = row
        .get(9)
        .map_err(|e| StoreError::corrupt(format!("database creator_id: {}", e)))?;
    let created_at: String = row
        .get(10)
        .map_err(|e| StoreError::corrupt(format!("database created_at: {}", e)))?;
    let updated_at: String = row
        .get(11)
        .map_err(|e| StoreError::corrupt(format!("database updated_at: {}", e)))?;
    let deleted_at: Option<String> = row
        .get(12)
        .map_err(|e| StoreError::corrupt(format!("database deleted_at: {}", e)))?;

    let properties: Vec<PropertyDefinition> = serde_json::from_str(&properties_json)
        .map_err(|e| StoreError::corrupt(format!("undecodable property list: {}", e)))?;
    let view_config: Value = serde_json::from_str(&view_config_json)
        .map_err(|e| StoreError::corrupt(format!("undecodable view config: {}", e)))?;

    Ok(Database {
        id,
        slug_id,
        title,
        icon,
        properties,
        view_config,
        page_id,
        space_id,
        workspace_id,
        creator_id,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
        deleted_at: parse_opt_timestamp(deleted_at.as_deref())?,
    })
}
