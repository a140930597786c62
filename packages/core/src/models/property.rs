//! Property Schema Types
//!
//! A database's schema is an ordered list of property definitions. The order
//! is the display order; every definition carries an identifier that stays
//! stable for the lifetime of the database, because row values are keyed by
//! that identifier and never by name or list position. Renaming or retyping
//! a property keeps its id, so already-stored row values remain addressable
//! (a retype does not rewrite or re-validate them).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// The typed column kinds a database schema can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    Text,
    Number,
    Select,
    MultiSelect,
    Date,
    Checkbox,
    Url,
    Email,
    Person,
    Files,
    Formula,
    Relation,
}

/// Display format for number properties
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberFormat {
    Number,
    Percent,
    Currency,
}

/// One choice of a select / multi-select property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectOption {
    pub id: String,
    pub label: String,
    pub color: String,
}

/// Default colors offered for select options
pub const SELECT_COLORS: &[&str] = &[
    "gray", "brown", "orange", "yellow", "green", "blue", "purple", "pink", "red",
];

/// Type-dependent configuration of a property.
///
/// Only the fields relevant to the property's type are populated; the rest
/// stay `None` and are omitted from the persisted JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyOptions {
    /// Choices for select and multi-select
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<SelectOption>>,

    /// Number display format
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<NumberFormat>,

    /// Whether date values carry a time component
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_time: Option<bool>,

    /// Date display format string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_format: Option<String>,

    /// Formula expression; opaque here, evaluated elsewhere
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,

    /// Target database of a relation property; not enforced here
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_database_id: Option<String>,
}

/// A typed column descriptor owned by a database's schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDefinition {
    /// Stable identifier; row values are keyed by this, never by name
    pub id: String,

    /// Display name
    pub name: String,

    #[serde(rename = "type")]
    pub property_type: PropertyType,

    /// Display width in pixels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<PropertyOptions>,
}

impl PropertyDefinition {
    /// Create a definition with a freshly generated identifier
    pub fn new(
        name: impl Into<String>,
        property_type: PropertyType,
        options: Option<PropertyOptions>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            property_type,
            width: None,
            options,
        }
    }

    /// Loose shape check of a row value against this property's type.
    ///
    /// The schema evolves independently of stored values, so this is
    /// advisory only: callers log mismatches, they never reject them.
    /// `null` clears a value and is always accepted.
    pub fn accepts(&self, value: &Value) -> bool {
        if value.is_null() {
            return true;
        }
        match self.property_type {
            PropertyType::Text | PropertyType::Url | PropertyType::Email | PropertyType::Date => {
                value.is_string()
            }
            PropertyType::Number => value.is_number(),
            PropertyType::Checkbox => value.is_boolean(),
            // a single option id
            PropertyType::Select => value.is_string(),
            // arrays of option / user / attachment ids
            PropertyType::MultiSelect | PropertyType::Person | PropertyType::Files => value
                .as_array()
                .map(|items| items.iter().all(Value::is_string))
                .unwrap_or(false),
            // computed and cross-database values are opaque to this core
            PropertyType::Formula | PropertyType::Relation => true,
        }
    }
}

/// Find a property definition by its stable id
pub fn find_property<'a>(
    properties: &'a [PropertyDefinition],
    property_id: &str,
) -> Option<&'a PropertyDefinition> {
    properties.iter().find(|p| p.id == property_id)
}
