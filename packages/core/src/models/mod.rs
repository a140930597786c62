//! Data Models
//!
//! Core data structures for database blocks:
//!
//! - `Database` - schema container with its ordered property list
//! - `PropertyDefinition` - typed column descriptors and their options
//! - `DatabaseRow` - position-ordered rows with untyped property values
//!
//! All JSON columns serialize in camelCase, matching the shape the client
//! persists and reads back.

mod database;
mod property;
mod row;

pub use database::{Database, NewDatabase};
pub use property::{
    find_property, NumberFormat, PropertyDefinition, PropertyOptions, PropertyType, SelectOption,
    SELECT_COLORS,
};
pub use row::{DatabaseRow, NewRow};
