//! Database Service - schema lifecycle
//!
//! Creates database blocks and evolves their property schemas. Every schema
//! mutation is a read-modify-write of the full property list executed inside
//! one transaction: the list is fetched, the single change applied, and the
//! whole list persisted atomically. There is no finer-grained concurrency
//! control than that - two racing schema edits resolve as last-writer-wins
//! at whole-list granularity, which callers must tolerate.
//!
//! Property identifiers never change once assigned: rows key their values by
//! property id, so renames and retypes keep existing values addressable. A
//! database always keeps at least one property; deleting the last one is
//! rejected.

use crate::db::{DatabaseStore, RowStore, Storage};
use crate::models::{Database, NewDatabase, PropertyDefinition, PropertyOptions, PropertyType};
use crate::services::error::ServiceError;
use crate::services::txn;
use crate::utils::generate_slug_id;
use serde_json::Value;
use std::sync::Arc;

/// Parameters for creating a database block
#[derive(Debug, Clone, Default)]
pub struct CreateDatabaseParams {
    /// Page the block is embedded in
    pub page_id: Option<String>,
    /// Owning space (the authorization scope callers check against)
    pub space_id: String,
    pub title: Option<String>,
    pub icon: Option<String>,
}

/// Partial database update; absent fields keep their current value
#[derive(Debug, Clone, Default)]
pub struct UpdateDatabaseParams {
    pub title: Option<String>,
    pub icon: Option<String>,
    pub view_config: Option<Value>,
}

/// Partial property update; absent fields keep their current value
#[derive(Debug, Clone, Default)]
pub struct UpdatePropertyParams {
    pub name: Option<String>,
    pub property_type: Option<PropertyType>,
    pub width: Option<i64>,
    pub options: Option<PropertyOptions>,
}

/// Orchestrates database creation and schema evolution
#[derive(Debug, Clone)]
pub struct DatabaseService {
    storage: Arc<Storage>,
    databases: DatabaseStore,
    rows: RowStore,
}

impl DatabaseService {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self {
            databases: DatabaseStore::new(storage.clone()),
            rows: RowStore::new(storage.clone()),
            storage,
        }
    }

    /// Create a database block with its seed schema.
    ///
    /// A database is never schema-less: it starts with a single text
    /// property named "Title".
    pub async fn create(
        &self,
        creator_id: &str,
        workspace_id: &str,
        params: CreateDatabaseParams,
    ) -> Result<Database, ServiceError> {
        let database = NewDatabase {
            slug_id: generate_slug_id(),
            title: Some(
                params
                    .title
                    .unwrap_or_else(|| "Untitled Database".to_string()),
            ),
            icon: params.icon,
            properties: vec![PropertyDefinition::new("Title", PropertyType::Text, None)],
            page_id: params.page_id,
            space_id: params.space_id,
            workspace_id: workspace_id.to_string(),
            creator_id: Some(creator_id.to_string()),
        };

        let created = self
            .databases
            .insert(&database, None)
            .await
            .map_err(ServiceError::from_insert)?;
        tracing::debug!(database_id = %created.id, "created database block");
        Ok(created)
    }

    /// Get a live database by id
    pub async fn find_by_id(&self, database_id: &str) -> Result<Database, ServiceError> {
        self.databases
            .find_by_id(database_id, None)
            .await?
            .ok_or_else(|| ServiceError::database_not_found(database_id))
    }

    /// Get a live database by its slug identifier
    pub async fn find_by_slug(&self, slug_id: &str) -> Result<Database, ServiceError> {
        self.databases
            .find_by_slug(slug_id, None)
            .await?
            .ok_or_else(|| ServiceError::database_not_found(slug_id))
    }

    /// List the live databases embedded in a page
    pub async fn find_by_page(
        &self,
        page_id: &str,
        workspace_id: &str,
    ) -> Result<Vec<Database>, ServiceError> {
        Ok(self.databases.find_by_page(page_id, workspace_id, None).await?)
    }

    /// Patch title, icon and view configuration; absent fields are kept
    pub async fn update(
        &self,
        database_id: &str,
        params: UpdateDatabaseParams,
    ) -> Result<Database, ServiceError> {
        let current = self.find_by_id(database_id).await?;

        let title = params.title.or(current.title);
        let icon = params.icon.or(current.icon);
        let view_config = params.view_config.unwrap_or(current.view_config);

        self.databases
            .update(
                database_id,
                title.as_deref(),
                icon.as_deref(),
                &view_config,
                None,
            )
            .await?;

        self.find_by_id(database_id).await
    }

    /// Tombstone a database and all of its rows.
    ///
    /// Runs in one transaction so the block and its rows disappear together.
    pub async fn delete(&self, database_id: &str) -> Result<(), ServiceError> {
        let conn = self.storage.connect_with_timeout().await?;
        txn::begin(&conn).await?;
        match self.delete_in_tx(&conn, database_id).await {
            Ok(()) => {
                txn::commit(&conn).await?;
                tracing::debug!(database_id, "soft deleted database block");
                Ok(())
            }
            Err(e) => {
                txn::rollback(&conn).await;
                Err(e)
            }
        }
    }

    async fn delete_in_tx(
        &self,
        conn: &libsql::Connection,
        database_id: &str,
    ) -> Result<(), ServiceError> {
        self.databases
            .find_by_id(database_id, Some(conn))
            .await?
            .ok_or_else(|| ServiceError::database_not_found(database_id))?;
        self.databases.soft_delete(database_id, Some(conn)).await?;
        self.rows
            .soft_delete_all_by_database(database_id, Some(conn))
            .await?;
        Ok(())
    }

    /// Permanently remove a database and its rows, bypassing tombstones.
    ///
    /// Idempotent: removing an absent database succeeds.
    pub async fn hard_delete(&self, database_id: &str) -> Result<(), ServiceError> {
        let conn = self.storage.connect_with_timeout().await?;
        txn::begin(&conn).await?;
        match self.hard_delete_in_tx(&conn, database_id).await {
            Ok(()) => {
                txn::commit(&conn).await?;
                Ok(())
            }
            Err(e) => {
                txn::rollback(&conn).await;
                Err(e)
            }
        }
    }

    async fn hard_delete_in_tx(
        &self,
        conn: &libsql::Connection,
        database_id: &str,
    ) -> Result<(), ServiceError> {
        self.rows
            .hard_delete_all_by_database(database_id, Some(conn))
            .await?;
        self.databases.hard_delete(database_id, Some(conn)).await?;
        Ok(())
    }

    /// Append a property to the end of the schema.
    ///
    /// The new property gets a freshly generated id; existing ids are never
    /// touched.
    pub async fn add_property(
        &self,
        database_id: &str,
        name: &str,
        property_type: PropertyType,
        options: Option<PropertyOptions>,
    ) -> Result<Database, ServiceError> {
        self.mutate_properties(database_id, |properties| {
            properties.push(PropertyDefinition::new(name, property_type, options));
            Ok(())
        })
        .await
    }

    /// Patch a property in place; its id and schema position never change
    pub async fn update_property(
        &self,
        database_id: &str,
        property_id: &str,
        params: UpdatePropertyParams,
    ) -> Result<Database, ServiceError> {
        self.mutate_properties(database_id, |properties| {
            let property = properties
                .iter_mut()
                .find(|p| p.id == property_id)
                .ok_or_else(|| ServiceError::property_not_found(property_id))?;

            if let Some(name) = params.name {
                property.name = name;
            }
            if let Some(property_type) = params.property_type {
                // a retype does not rewrite stored row values; they stay as
                // they are until the UI reconciles them
                property.property_type = property_type;
            }
            if let Some(width) = params.width {
                property.width = Some(width);
            }
            if let Some(options) = params.options {
                property.options = Some(options);
            }
            Ok(())
        })
        .await
    }

    /// Remove a property from the schema.
    ///
    /// Rejected with `InvalidState` when it would leave the schema empty.
    /// Row values keyed by the removed id stay in storage untouched.
    pub async fn delete_property(
        &self,
        database_id: &str,
        property_id: &str,
    ) -> Result<Database, ServiceError> {
        self.mutate_properties(database_id, |properties| {
            let before = properties.len();
            properties.retain(|p| p.id != property_id);
            if properties.len() == before {
                return Err(ServiceError::property_not_found(property_id));
            }
            if properties.is_empty() {
                return Err(ServiceError::invalid_state(
                    "cannot delete the last property",
                ));
            }
            Ok(())
        })
        .await
    }

    /// Read-modify-write of the full property list inside one transaction.
    ///
    /// `mutate` sees the current list and edits it in place; the whole list
    /// is then persisted. A failure anywhere rolls the transaction back.
    async fn mutate_properties<F>(
        &self,
        database_id: &str,
        mutate: F,
    ) -> Result<Database, ServiceError>
    where
        F: FnOnce(&mut Vec<PropertyDefinition>) -> Result<(), ServiceError>,
    {
        let conn = self.storage.connect_with_timeout().await?;
        txn::begin(&conn).await?;
        match self.mutate_properties_in_tx(&conn, database_id, mutate).await {
            Ok(database) => {
                txn::commit(&conn).await?;
                Ok(database)
            }
            Err(e) => {
                txn::rollback(&conn).await;
                Err(e)
            }
        }
    }

    async fn mutate_properties_in_tx<F>(
        &self,
        conn: &libsql::Connection,
        database_id: &str,
        mutate: F,
    ) -> Result<Database, ServiceError>
    where
        F: FnOnce(&mut Vec<PropertyDefinition>) -> Result<(), ServiceError>,
    {
        let database = self
            .databases
            .find_by_id(database_id, Some(conn))
            .await?
            .ok_or_else(|| ServiceError::database_not_found(database_id))?;

        let mut properties = database.properties;
        mutate(&mut properties)?;

        self.databases
            .update_properties(database_id, &properties, Some(conn))
            .await?;

        self.databases
            .find_by_id(database_id, Some(conn))
            .await?
            .ok_or_else(|| ServiceError::database_not_found(database_id))
    }
}
