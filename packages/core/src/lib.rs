//! Tabular Core Business Logic Layer
//!
//! This crate is the data model and storage core behind "database blocks":
//! typed, ordered record stores embedded in collaborative documents. A block
//! owns an evolvable property schema; its rows carry values keyed by stable
//! property ids and are ordered by fractional position keys, so inserting or
//! moving a row never renumbers its siblings.
//!
//! Out of scope by design: the rich-text editor owning row content (opaque
//! payload here), authorization (callers gate on the owning space), and the
//! HTTP layer (errors surface as typed kinds, not status codes).
//!
//! # Modules
//!
//! - [`models`] - entities: databases, property definitions, rows
//! - [`db`] - libsql storage, position allocation, pagination
//! - [`services`] - schema and row lifecycle orchestration

pub mod db;
pub mod models;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use db::*;
pub use models::*;
pub use services::*;
