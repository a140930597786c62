//! Row Store - SQL operations for database rows
//!
//! Persistence for the `database_rows` table, serving rows back in position
//! order (bytewise on the position key, row id as tie-break). The `content`
//! column holds the row's rich-text payload and is only selected when a
//! caller asks for it; list queries never touch it.

use crate::db::convert::{parse_opt_timestamp, parse_timestamp};
use crate::db::error::StoreError;
use crate::db::pagination::{PageMeta, Paginated, Pagination};
use crate::db::storage::Storage;
use crate::models::{DatabaseRow, NewRow};
use serde_json::{Map, Value};
use std::sync::Arc;
use uuid::Uuid;

const ROW_COLUMNS: &str = "id, slug_id, position, title, icon, properties, database_id, \
     space_id, workspace_id, creator_id, last_updated_by_id, created_at, updated_at, deleted_at";

/// Full-field update of a row's mutable attributes (see [`RowStore::update_row`])
#[derive(Debug)]
pub struct UpdateRowRecord<'a> {
    pub id: &'a str,
    pub title: Option<&'a str>,
    pub icon: Option<&'a str>,
    pub properties: &'a Map<String, Value>,
    pub last_updated_by_id: Option<&'a str>,
}

/// SQL CRUD over the `database_rows` table.
///
/// Every method accepts an optional connection; `None` acquires a fresh one,
/// `Some` joins whatever transaction the caller has open on it.
#[derive(Debug, Clone)]
pub struct RowStore {
    storage: Arc<Storage>,
}

impl RowStore {
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

    /// Insert a new row and return it as stored.
    ///
    /// The caller has already allocated the position key; the id is assigned
    /// here and timestamps come from the database defaults. A slug collision
    /// surfaces as [`StoreError::UniqueViolation`].
    pub async fn insert(
        &self,
        new_row: &NewRow,
        conn: Option<&libsql::Connection>,
    ) -> Result<DatabaseRow, StoreError> {
        let conn = self.conn_or(conn).await?;
        let id = Uuid::new_v4().to_string();
        let properties = serde_json::to_string(&new_row.properties)
            .map_err(|e| StoreError::corrupt(format!("unserializable properties: {}", e)))?;

        conn.execute(
            "INSERT INTO database_rows (id, slug_id, position, title, icon, properties, database_id, space_id, workspace_id, creator_id)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            (
                id.as_str(),
                new_row.slug_id.as_str(),
                new_row.position.as_str(),
                new_row.title.as_deref(),
                new_row.icon.as_deref(),
                properties.as_str(),
                new_row.database_id.as_str(),
                new_row.space_id.as_str(),
                new_row.workspace_id.as_str(),
                new_row.creator_id.as_deref(),
            ),
        )
        .await
        .map_err(|e| StoreError::from_insert("failed to insert row", e))?;

        self.find_by_id(&id, false, Some(&conn))
            .await?
            .ok_or_else(|| StoreError::sql("row missing after insert"))
    }

    /// Get a live row by id; the content payload is only fetched on request
    pub async fn find_by_id(
        &self,
        row_id: &str,
        include_content: bool,
        conn: Option<&libsql::Connection>,
    ) -> Result<Option<DatabaseRow>, StoreError> {
        self.find_by_column("id", row_id, include_content, conn)
            .await
    }

    /// Get a live row by its slug identifier
    pub async fn find_by_slug(
        &self,
        slug_id: &str,
        include_content: bool,
        conn: Option<&libsql::Connection>,
    ) -> Result<Option<DatabaseRow>, StoreError> {
        self.find_by_column("slug_id", slug_id, include_content, conn)
            .await
    }

    async fn find_by_column(
        &self,
        column: &str,
        value: &str,
        include_content: bool,
        conn: Option<&libsql::Connection>,
    ) -> Result<Option<DatabaseRow>, StoreError> {
        let conn = self.conn_or(conn).await?;
        let sql = if include_content {
            format!(
                "SELECT {}, content FROM database_rows WHERE {} = ? AND deleted_at IS NULL",
                ROW_COLUMNS, column
            )
        } else {
            format!(
                "SELECT {} FROM database_rows WHERE {} = ? AND deleted_at IS NULL",
                ROW_COLUMNS, column
            )
        };

        let mut stmt = conn
            .prepare(&sql)
            .await
            .map_err(|e| StoreError::sql(format!("failed to prepare row query: {}", e)))?;
        let mut rows = stmt
            .query([value])
            .await
            .map_err(|e| StoreError::sql(format!("failed to query row: {}", e)))?;

        match rows.next().await.map_err(|e| StoreError::sql(e.to_string()))? {
            Some(row) => Ok(Some(row_to_database_row(&row, include_content)?)),
            None => Ok(None),
        }
    }

    /// One page of a database's live rows, position ascending.
    ///
    /// Identical position keys (possible only on a jitter collision) are
    /// tie-broken by row id, so the order stays total and stable.
    pub async fn list_by_database(
        &self,
        database_id: &str,
        pagination: Pagination,
        conn: Option<&libsql::Connection>,
    ) -> Result<Paginated<DatabaseRow>, StoreError> {
        let conn = self.conn_or(conn).await?;
        let total = self.count_rows(database_id, Some(&conn)).await?;

        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM database_rows
                 WHERE database_id = ? AND deleted_at IS NULL
                 ORDER BY position ASC, id ASC
                 LIMIT ? OFFSET ?",
                ROW_COLUMNS
            ))
            .await
            .map_err(|e| StoreError::sql(format!("failed to prepare list query: {}", e)))?;

        let mut rows = stmt
            .query((
                database_id,
                i64::from(pagination.limit),
                pagination.offset() as i64,
            ))
            .await
            .map_err(|e| StoreError::sql(format!("failed to list rows: {}", e)))?;

        let mut items = Vec::new();
        while let Some(row) = rows.next().await.map_err(|e| StoreError::sql(e.to_string()))? {
            items.push(row_to_database_row(&row, false)?);
        }

        Ok(Paginated {
            items,
            meta: PageMeta::new(pagination, total),
        })
    }

    /// Position of the last live row, or `None` for an empty database.
    ///
    /// Read inside the same transaction as the subsequent insert so that the
    /// append position cannot race a concurrent create.
    pub async fn last_position(
        &self,
        database_id: &str,
        conn: Option<&libsql::Connection>,
    ) -> Result<Option<String>, StoreError> {
        let conn = self.conn_or(conn).await?;
        let mut stmt = conn
            .prepare(
                "SELECT position FROM database_rows
                 WHERE database_id = ? AND deleted_at IS NULL
                 ORDER BY position DESC, id DESC
                 LIMIT 1",
            )
            .await
            .map_err(|e| StoreError::sql(format!("failed to prepare position query: {}", e)))?;

        let mut rows = stmt
            .query([database_id])
            .await
            .map_err(|e| StoreError::sql(format!("failed to query last position: {}", e)))?;

        match rows.next().await.map_err(|e| StoreError::sql(e.to_string()))? {
            Some(row) => {
                let position: String = row
                    .get(0)
                    .map_err(|e| StoreError::corrupt(format!("row position: {}", e)))?;
                Ok(Some(position))
            }
            None => Ok(None),
        }
    }

    /// Write a row's mutable attributes (title, icon, properties).
    ///
    /// Callers pass the complete new values; merging partial input into the
    /// current state happens in the service. Content and position are
    /// deliberately out of reach of this statement.
    pub async fn update_row(
        &self,
        record: UpdateRowRecord<'_>,
        conn: Option<&libsql::Connection>,
    ) -> Result<(), StoreError> {
        let conn = self.conn_or(conn).await?;
        let properties = serde_json::to_string(record.properties)
            .map_err(|e| StoreError::corrupt(format!("unserializable properties: {}", e)))?;
        conn.execute(
            "UPDATE database_rows
             SET title = ?, icon = ?, properties = ?, last_updated_by_id = ?,
                 updated_at = CURRENT_TIMESTAMP
             WHERE id = ?",
            (
                record.title,
                record.icon,
                properties.as_str(),
                record.last_updated_by_id,
                record.id,
            ),
        )
        .await
        .map_err(|e| StoreError::sql(format!("failed to update row: {}", e)))?;
        Ok(())
    }

    /// Move a row by rewriting only its position key
    pub async fn update_position(
        &self,
        row_id: &str,
        position: &str,
        conn: Option<&libsql::Connection>,
    ) -> Result<(), StoreError> {
        let conn = self.conn_or(conn).await?;
        conn.execute(
            "UPDATE database_rows
             SET position = ?, updated_at = CURRENT_TIMESTAMP
             WHERE id = ?",
            (position, row_id),
        )
        .await
        .map_err(|e| StoreError::sql(format!("failed to update row position: {}", e)))?;
        Ok(())
    }

    /// Replace the content payload wholesale
    pub async fn update_content(
        &self,
        row_id: &str,
        content: Option<&Value>,
        last_updated_by_id: Option<&str>,
        conn: Option<&libsql::Connection>,
    ) -> Result<(), StoreError> {
        let conn = self.conn_or(conn).await?;
        let content = content
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| StoreError::corrupt(format!("unserializable content: {}", e)))?;
        conn.execute(
            "UPDATE database_rows
             SET content = ?, last_updated_by_id = ?, updated_at = CURRENT_TIMESTAMP
             WHERE id = ?",
            (content.as_deref(), last_updated_by_id, row_id),
        )
        .await
        .map_err(|e| StoreError::sql(format!("failed to update row content: {}", e)))?;
        Ok(())
    }

    /// Tombstone a row; it disappears from every subsequent read
    pub async fn soft_delete(
        &self,
        row_id: &str,
        conn: Option<&libsql::Connection>,
    ) -> Result<(), StoreError> {
        let conn = self.conn_or(conn).await?;
        conn.execute(
            "UPDATE database_rows SET deleted_at = CURRENT_TIMESTAMP
             WHERE id = ? AND deleted_at IS NULL",
            [row_id],
        )
        .await
        .map_err(|e| StoreError::sql(format!("failed to soft delete row: {}", e)))?;
        Ok(())
    }

    /// Tombstone every live row of a database in one statement
    pub async fn soft_delete_all_by_database(
        &self,
        database_id: &str,
        conn: Option<&libsql::Connection>,
    ) -> Result<(), StoreError> {
        let conn = self.conn_or(conn).await?;
        conn.execute(
            "UPDATE database_rows SET deleted_at = CURRENT_TIMESTAMP
             WHERE database_id = ? AND deleted_at IS NULL",
            [database_id],
        )
        .await
        .map_err(|e| StoreError::sql(format!("failed to soft delete rows: {}", e)))?;
        Ok(())
    }

    /// Permanently remove a row, tombstoned or not.
    ///
    /// Idempotent: deleting an absent row returns 0 affected rows.
    pub async fn hard_delete(
        &self,
        row_id: &str,
        conn: Option<&libsql::Connection>,
    ) -> Result<u64, StoreError> {
        let conn = self.conn_or(conn).await?;
        conn.execute("DELETE FROM database_rows WHERE id = ?", [row_id])
            .await
            .map_err(|e| StoreError::sql(format!("failed to delete row: {}", e)))
    }

    /// Permanently remove every row of a database, tombstoned or not
    pub async fn hard_delete_all_by_database(
        &self,
        database_id: &str,
        conn: Option<&libsql::Connection>,
    ) -> Result<u64, StoreError> {
        let conn = self.conn_or(conn).await?;
        conn.execute(
            "DELETE FROM database_rows WHERE database_id = ?",
            [database_id],
        )
        .await
        .map_err(|e| StoreError::sql(format!("failed to delete rows: {}", e)))
    }

    /// Count of live rows in a database
    pub async fn count_rows(
        &self,
        database_id: &str,
        conn: Option<&libsql::Connection>,
    ) -> Result<u64, StoreError> {
        let conn = self.conn_or(conn).await?;
        let mut stmt = conn
            .prepare(
                "SELECT COUNT(*) FROM database_rows
                 WHERE database_id = ? AND deleted_at IS NULL",
            )
            .await
            .map_err(|e| StoreError::sql(format!("failed to prepare count query: {}", e)))?;

        let mut rows = stmt
            .query([database_id])
            .await
            .map_err(|e| StoreError::sql(format!("failed to count rows: {}", e)))?;

        let row = rows
            .next()
            .await
            .map_err(|e| StoreError::sql(e.to_string()))?
            .ok_or_else(|| StoreError::sql("count query returned no rows"))?;
        let count: i64 = row
            .get(0)
            .map_err(|e| StoreError::corrupt(format!("row count: {}", e)))?;
        Ok(count as u64)
    }
}

/// Convert a libsql row to a [`DatabaseRow`]; columns per `ROW_COLUMNS`,
/// with `content` appended when it was selected
fn row_to_database_row(
    row: &libsql::Row,
    include_content: bool,
) -> Result<DatabaseRow, StoreError> {
    let id: String = row
        .get(0)
        .map_err(|e| StoreError::corrupt(format!("row id: {}", e)))?;
    let slug_id: String = row
        .get(1)
        .map_err(|e| StoreError::corrupt(format!("row slug_id: {}", e)))?;
    let position: String = row
        .get(2)
        .map_err(|e| StoreError::corrupt(format!("row position: {}", e)))?;
    let title: Option<String> = row
        .get(3)
        .map_err(|e| StoreError::corrupt(format!("row title: {}", e)))?;
    let icon: Option<String> = row
        .get(4)
        .map_err(|e| StoreError::corrupt(format!("row icon: {}", e)))?;
    let properties_json: String = row
        .get(5)
        .map_err(|e| StoreError::corrupt(format!("row properties: {}", e)))?;
    let database_id: String = row
        .get(6)
        .map_err(|e| StoreError::corrupt(format!("row database_id: {}", e)))?;
    let space_id: String = row
        .get(7)
        .map_err(|e| StoreError::corrupt(format!("row space_id: {}", e)))?;
    let workspace_id: String = row
        .get(8)
        .map_err(|e| StoreError::corrupt(format!("row workspace_id: {}", e)))?;
    let creator_id: Option<String> = row
        .get(9)
        .map_err(|e| StoreError::corrupt(format!("row creator_id: {}", e)))?;
    let last_updated_by_id: Option<String> = row
        .get(10)
        .map_err(|e| StoreError::corrupt(format!("row last_updated_by_id: {}", e)))?;
    let created_at: String = row
        .get(11)
        .map_err(|e| StoreError::corrupt(format!("row created_at: {}", e)))?;
    let updated_at: String = row
        .get(12)
        .map_err(|e| StoreError::corrupt(format!("row updated_at: {}", e)))?;
    let deleted_at: Option<String> = row
        .get(13)
        .map_err(|e| StoreError::corrupt(format!("row deleted_at: {}", e)))?;

    let properties: Map<String, Value> = serde_json::from_str(&properties_json)
        .map_err(|e| StoreError::corrupt(format!("undecodable row properties: {}", e)))?;

    let content = if include_content {
        let content_json: Option<String> = row
            .get(14)
            .map_err(|e| StoreError::corrupt(format!("row content: {}", e)))?;
        content_json
            .map(|json| serde_json::from_str(&json))
            .transpose()
            .map_err(|e| StoreError::corrupt(format!("undecodable row content: {}", e)))?
    } else {
        None
    };

    Ok(DatabaseRow {
        id,
        slug_id,
        position,
        title,
        icon,
        properties,
        content,
        database_id,
        space_id,
        workspace_id,
        creator_id,
        last_updated_by_id,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
        deleted_at: parse_opt_timestamp(deleted_at.as_deref())?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewRow;
    use serde_json::json;
    use tempfile::TempDir;

    async fn create_test_store() -> (RowStore, Storage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let storage = Storage::new(temp_dir.path().join("test.db")).await.unwrap();
        (RowStore::new(Arc::new(storage.clone())), storage, temp_dir)
    }

    async fn seed_database(storage: &Storage, database_id: &str) {
        let conn = storage.connect_with_timeout().await.unwrap();
        conn.execute(
            "INSERT INTO databases (id, slug_id, properties, space_id, workspace_id)
             VALUES (?, ?, '[]', 'space-1', 'ws-1')",
            (database_id, format!("slug-{}", database_id)),
        )
        .await
        .unwrap();
    }

    fn new_row(database_id: &str, slug_id: &str, position: &str) -> NewRow {
        NewRow {
            slug_id: slug_id.to_string(),
            position: position.to_string(),
            title: None,
            icon: None,
            properties: Map::new(),
            database_id: database_id.to_string(),
            space_id: "space-1".to_string(),
            workspace_id: "ws-1".to_string(),
            creator_id: None,
        }
    }

    #[tokio::test]
    async fn test_slug_collision_is_a_distinct_failure() {
        let (store, storage, _temp) = create_test_store().await;
        seed_database(&storage, "db-1").await;

        store
            .insert(&new_row("db-1", "same-slug", "a0"), None)
            .await
            .unwrap();
        let err = store
            .insert(&new_row("db-1", "same-slug", "a1"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_content_column_only_read_on_request() {
        let (store, storage, _temp) = create_test_store().await;
        seed_database(&storage, "db-1").await;

        let row = store.insert(&new_row("db-1", "s1", "a0"), None).await.unwrap();
        store
            .update_content(&row.id, Some(&json!({"doc": true})), None, None)
            .await
            .unwrap();

        let bare = store.find_by_id(&row.id, false, None).await.unwrap().unwrap();
        assert!(bare.content.is_none());
        let full = store.find_by_id(&row.id, true, None).await.unwrap().unwrap();
        assert_eq!(full.content, Some(json!({"doc": true})));

        // list never carries content
        let page = store
            .list_by_database("db-1", Pagination::default(), None)
            .await
            .unwrap();
        assert!(page.items[0].content.is_none());
    }

    #[tokio::test]
    async fn test_identical_positions_tie_break_on_id() {
        let (store, storage, _temp) = create_test_store().await;
        seed_database(&storage, "db-1").await;

        // an exact jitter collision leaves both rows in the order
        let a = store.insert(&new_row("db-1", "s1", "a0X"), None).await.unwrap();
        let b = store.insert(&new_row("db-1", "s2", "a0X"), None).await.unwrap();

        let page = store
            .list_by_database("db-1", Pagination::default(), None)
            .await
            .unwrap();
        assert_eq!(page.items.len(), 2);
        let mut ids: Vec<String> = page.items.iter().map(|r| r.id.clone()).collect();
        let listed = ids.clone();
        ids.sort();
        assert_eq!(listed, ids);
        assert!(ids.contains(&a.id));
        assert!(ids.contains(&b.id));
    }

    #[tokio::test]
    async fn test_last_position_ignores_tombstones() {
        let (store, storage, _temp) = create_test_store().await;
        seed_database(&storage, "db-1").await;

        store.insert(&new_row("db-1", "s1", "a0"), None).await.unwrap();
        let tail = store.insert(&new_row("db-1", "s2", "a1"), None).await.unwrap();

        assert_eq!(
            store.last_position("db-1", None).await.unwrap().as_deref(),
            Some("a1")
        );
        store.soft_delete(&tail.id, None).await.unwrap();
        assert_eq!(
            store.last_position("db-1", None).await.unwrap().as_deref(),
            Some("a0")
        );
        assert_eq!(store.last_position("db-2", None).await.unwrap(), None);
    }
}
