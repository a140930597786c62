//! Database Entity
//!
//! A database is the schema container behind a database block embedded in a
//! page: an ordered property list plus addressing and tenancy metadata. It
//! lives and dies with its block (soft-deleted when the block is removed)
//! while its rows are tombstoned independently.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::property::PropertyDefinition;

/// A database block's schema container.
///
/// `slug_id` is the immutable external address; `properties` is the ordered
/// column list (a live database always has at least one entry);
/// `view_config` is sort/filter/hidden-column state owned by the UI and
/// never interpreted here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Database {
    pub id: String,
    pub slug_id: String,
    pub title: Option<String>,
    pub icon: Option<String>,
    pub properties: Vec<PropertyDefinition>,
    pub view_config: Value,
    pub page_id: Option<String>,
    pub space_id: String,
    pub workspace_id: String,
    pub creator_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Insertable database record; ids and timestamps are assigned by the store
#[derive(Debug, Clone)]
pub struct NewDatabase {
    pub slug_id: String,
    pub title: Option<String>,
    pub icon: Option<String>,
    pub properties: Vec<PropertyDefinition>,
    pub page_id: Option<String>,
    pub space_id: String,
    pub workspace_id: String,
    pub creator_id: Option<String>,
}
