//! Database Row Entity
//!
//! A row holds typed property values keyed by property id, an opaque
//! rich-text `content` payload, and a fractional `position` key that orders
//! it within its database. Property values are untyped JSON at this
//! boundary; the owning database's schema gives them meaning.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single row of a database block.
///
/// `content` is the row's rich-text body. It is large, unrelated to typed
/// property access, and therefore only fetched when explicitly requested;
/// `None` means "not loaded" on most read paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseRow {
    pub id: String,
    pub slug_id: String,
    /// Opaque ordering key, compared bytewise; see `db::position`
    pub position: String,
    pub title: Option<String>,
    pub icon: Option<String>,
    /// Property id -> value; loosely validated against the owning schema
    pub properties: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Value>,
    pub database_id: String,
    pub space_id: String,
    pub workspace_id: String,
    pub creator_id: Option<String>,
    pub last_updated_by_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Insertable row record; position must already be allocated by the caller
#[derive(Debug, Clone)]
pub struct NewRow {
    pub slug_id: String,
    pub position: String,
    pub title: Option<String>,
    pub icon: Option<String>,
    pub properties: Map<String, Value>,
    pub database_id: String,
    pub space_id: String,
    pub workspace_id: String,
    pub creator_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_content_is_omitted_when_not_loaded() {
        let row = DatabaseRow {
            id: "row-1".to_string(),
            slug_id: "s1".to_string(),
            position: "a0".to_string(),
            title: None,
            icon: None,
            properties: Map::new(),
            content: None,
            database_id: "db-1".to_string(),
            space_id: "space-1".to_string(),
            workspace_id: "ws-1".to_string(),
            creator_id: None,
            last_updated_by_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        };
        let value = serde_json::to_value(&row).unwrap();
        assert!(value.get("content").is_none());
        assert_eq!(value["position"], json!("a0"));
    }
}
