//! Row Service - row lifecycle
//!
//! Creates, reads, merges, moves and deletes rows against a database block's
//! schema. Position handling goes through the fractional allocator: append
//! on create, re-key on move, never touching sibling rows. Property updates
//! are a shallow merge into the existing map. The rich-text content payload
//! is opaque here and only travels through `update_content` / the
//! `include_content` read flag.
//!
//! Every operation resolves its target first and fails with `NotFound`
//! before attempting any write; read-then-write operations (create's append
//! position, move's anchor read) run inside one transaction.

use crate::db::{
    DatabaseStore, Paginated, Pagination, PositionAllocator, RowStore, Storage, UpdateRowRecord,
};
use crate::models::{Database, DatabaseRow, NewRow, PropertyType};
use crate::services::error::ServiceError;
use crate::services::txn;
use crate::utils::generate_slug_id;
use chrono::Utc;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Parameters for creating a row
#[derive(Debug, Clone, Default)]
pub struct CreateRowParams {
    pub database_id: String,
    pub title: Option<String>,
    pub icon: Option<String>,
    /// Initial property values keyed by property id
    pub properties: Option<Map<String, Value>>,
}

/// Partial row update.
///
/// `title` and `icon` are replaced wholesale when present; `properties` is
/// shallow-merged key by key into the existing map, never replacing it
/// wholesale. Content is not reachable from here.
#[derive(Debug, Clone, Default)]
pub struct UpdateRowParams {
    pub title: Option<String>,
    pub icon: Option<String>,
    pub properties: Option<Map<String, Value>>,
}

/// Target location for a row move; at most one anchor is honored.
///
/// `after_row_id` wins over `before_row_id`; with neither anchor the row is
/// re-keyed from the unbounded range at the head of the key space.
#[derive(Debug, Clone, Default)]
pub struct MoveRowParams {
    pub after_row_id: Option<String>,
    pub before_row_id: Option<String>,
}

/// Orchestrates the row lifecycle atop the row store and schema lookups
#[derive(Debug, Clone)]
pub struct RowService {
    storage: Arc<Storage>,
    rows: RowStore,
    databases: DatabaseStore,
}

impl RowService {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self {
            rows: RowStore::new(storage.clone()),
            databases: DatabaseStore::new(storage.clone()),
            storage,
        }
    }

    /// Create a row at the end of its database.
    ///
    /// The append position is computed from the current last position inside
    /// the same transaction as the insert, so two concurrent creates cannot
    /// read the same tail (and the jittered key keeps even same-boundary
    /// races apart).
    ///
    /// Any schema property of type `date` whose name case-insensitively
    /// equals "created" is auto-filled with today's date when the caller did
    /// not supply a value for it. This is a narrow name-based convenience,
    /// not a general default-value mechanism.
    pub async fn create(
        &self,
        creator_id: &str,
        params: CreateRowParams,
    ) -> Result<DatabaseRow, ServiceError> {
        let conn = self.storage.connect_with_timeout().await?;
        txn::begin(&conn).await?;
        match self.create_in_tx(&conn, creator_id, params).await {
            Ok(row) => {
                txn::commit(&conn).await?;
                tracing::debug!(row_id = %row.id, database_id = %row.database_id, "created row");
                Ok(row)
            }
            Err(e) => {
                txn::rollback(&conn).await;
                Err(e)
            }
        }
    }

    async fn create_in_tx(
        &self,
        conn: &libsql::Connection,
        creator_id: &str,
        params: CreateRowParams,
    ) -> Result<DatabaseRow, ServiceError> {
        let database = self
            .databases
            .find_by_id(&params.database_id, Some(conn))
            .await?
            .ok_or_else(|| ServiceError::database_not_found(&params.database_id))?;

        let last_position = self
            .rows
            .last_position(&params.database_id, Some(conn))
            .await?;
        let position = PositionAllocator::jittered_key_between(last_position.as_deref(), None)?;

        let mut properties = params.properties.unwrap_or_default();
        autofill_created_date(&database, &mut properties);
        warn_on_type_mismatches(&database, &properties);

        let new_row = NewRow {
            slug_id: generate_slug_id(),
            position,
            title: params.title,
            icon: params.icon,
            properties,
            database_id: database.id.clone(),
            space_id: database.space_id.clone(),
            workspace_id: database.workspace_id.clone(),
            creator_id: Some(creator_id.to_string()),
        };

        self.rows
            .insert(&new_row, Some(conn))
            .await
            .map_err(ServiceError::from_insert)
    }

    /// Get a live row by id; pass `include_content` to load the payload
    pub async fn find_by_id(
        &self,
        row_id: &str,
        include_content: bool,
    ) -> Result<DatabaseRow, ServiceError> {
        self.rows
            .find_by_id(row_id, include_content, None)
            .await?
            .ok_or_else(|| ServiceError::row_not_found(row_id))
    }

    /// Get a live row by its slug identifier
    pub async fn find_by_slug(
        &self,
        slug_id: &str,
        include_content: bool,
    ) -> Result<DatabaseRow, ServiceError> {
        self.rows
            .find_by_slug(slug_id, include_content, None)
            .await?
            .ok_or_else(|| ServiceError::row_not_found(slug_id))
    }

    /// One page of a database's live rows in position order.
    ///
    /// Page numbers are not a snapshot: rows inserted between page fetches
    /// shift later pages.
    pub async fn list(
        &self,
        database_id: &str,
        pagination: Pagination,
    ) -> Result<Paginated<DatabaseRow>, ServiceError> {
        Ok(self.rows.list_by_database(database_id, pagination, None).await?)
    }

    /// Patch a row's title, icon and properties.
    ///
    /// Properties are shallow-merged: keys present in the patch overwrite,
    /// everything else survives. Content is never touched here.
    pub async fn update(
        &self,
        actor_id: &str,
        row_id: &str,
        params: UpdateRowParams,
    ) -> Result<DatabaseRow, ServiceError> {
        let row = self.find_by_id(row_id, false).await?;

        let title = params.title.or(row.title);
        let icon = params.icon.or(row.icon);

        let mut properties = row.properties;
        if let Some(patch) = params.properties {
            if let Ok(Some(database)) = self.databases.find_by_id(&row.database_id, None).await {
                warn_on_type_mismatches(&database, &patch);
            }
            for (property_id, value) in patch {
                properties.insert(property_id, value);
            }
        }

        self.rows
            .update_row(
                UpdateRowRecord {
                    id: row_id,
                    title: title.as_deref(),
                    icon: icon.as_deref(),
                    properties: &properties,
                    last_updated_by_id: Some(actor_id),
                },
                None,
            )
            .await?;

        self.find_by_id(row_id, false).await
    }

    /// Replace the rich-text content payload wholesale.
    ///
    /// Independent of property and title updates; `null` clears the payload.
    /// Returns the row with content included.
    pub async fn update_content(
        &self,
        actor_id: &str,
        row_id: &str,
        content: Value,
    ) -> Result<DatabaseRow, ServiceError> {
        self.find_by_id(row_id, false).await?;

        let stored = if content.is_null() {
            None
        } else {
            Some(&content)
        };
        self.rows
            .update_content(row_id, stored, Some(actor_id), None)
            .await?;

        self.find_by_id(row_id, true).await
    }

    /// Re-key a row relative to an anchor; only its position changes.
    ///
    /// The anchor's current position is one bound and the other side stays
    /// open, so the moved row lands directly next to the anchor no matter
    /// what else sits beyond it. Anchor read and position write share one
    /// transaction.
    pub async fn move_row(
        &self,
        row_id: &str,
        params: MoveRowParams,
    ) -> Result<DatabaseRow, ServiceError> {
        let conn = self.storage.connect_with_timeout().await?;
        txn::begin(&conn).await?;
        match self.move_in_tx(&conn, row_id, params).await {
            Ok(row) => {
                txn::commit(&conn).await?;
                Ok(row)
            }
            Err(e) => {
                txn::rollback(&conn).await;
                Err(e)
            }
        }
    }

    async fn move_in_tx(
        &self,
        conn: &libsql::Connection,
        row_id: &str,
        params: MoveRowParams,
    ) -> Result<DatabaseRow, ServiceError> {
        self.rows
            .find_by_id(row_id, false, Some(conn))
            .await?
            .ok_or_else(|| ServiceError::row_not_found(row_id))?;

        let position = if let Some(after_row_id) = &params.after_row_id {
            let anchor = self
                .rows
                .find_by_id(after_row_id, false, Some(conn))
                .await?
                .ok_or_else(|| ServiceError::row_not_found(after_row_id))?;
            PositionAllocator::jittered_key_between(Some(&anchor.position), None)?
        } else if let Some(before_row_id) = &params.before_row_id {
            let anchor = self
                .rows
                .find_by_id(before_row_id, false, Some(conn))
                .await?
                .ok_or_else(|| ServiceError::row_not_found(before_row_id))?;
            PositionAllocator::jittered_key_between(None, Some(&anchor.position))?
        } else {
            // no anchor: allocate from the unbounded range
            PositionAllocator::jittered_key_between(None, None)?
        };

        self.rows.update_position(row_id, &position, Some(conn)).await?;

        self.rows
            .find_by_id(row_id, false, Some(conn))
            .await?
            .ok_or_else(|| ServiceError::row_not_found(row_id))
    }

    /// Tombstone a row; it disappears from lists and lookups
    pub async fn delete(&self, row_id: &str) -> Result<(), ServiceError> {
        self.find_by_id(row_id, false).await?;
        self.rows.soft_delete(row_id, None).await?;
        Ok(())
    }

    /// Permanently remove a row, tombstoned or not.
    ///
    /// Idempotent: removing an absent (or already hard-deleted) row
    /// succeeds.
    pub async fn hard_delete(&self, row_id: &str) -> Result<(), ServiceError> {
        self.rows.hard_delete(row_id, None).await?;
        Ok(())
    }

    /// Count of live rows, for display and pagination metadata
    pub async fn count_rows(&self, database_id: &str) -> Result<u64, ServiceError> {
        Ok(self.rows.count_rows(database_id, None).await?)
    }
}

/// Auto-fill date properties named "created" (case-insensitive) with today's
/// date in `YYYY-MM-DD` form, only when the caller did not supply a value.
fn autofill_created_date(database: &Database, properties: &mut Map<String, Value>) {
    for property in &database.properties {
        if property.property_type == PropertyType::Date
            && property.name.eq_ignore_ascii_case("created")
            && !properties.contains_key(&property.id)
        {
            properties.insert(
                property.id.clone(),
                Value::String(Utc::now().format("%Y-%m-%d").to_string()),
            );
        }
    }
}

/// Loose schema check: log value/type mismatches, never reject them.
/// The schema can evolve under stored values, so a mismatch is expected
/// state, not an error.
fn warn_on_type_mismatches(database: &Database, properties: &Map<String, Value>) {
    for (property_id, value) in properties {
        match crate::models::find_property(&database.properties, property_id) {
            Some(property) => {
                if !property.accepts(value) {
                    tracing::warn!(
                        database_id = %database.id,
                        property_id = %property_id,
                        property_type = ?property.property_type,
                        "row value does not match property type"
                    );
                }
            }
            None => {
                tracing::warn!(
                    database_id = %database.id,
                    property_id = %property_id,
                    "row value references a property missing from the schema"
                );
            }
        }
    }
}
