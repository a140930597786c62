//! Business Services
//!
//! The orchestration layer for database blocks:
//!
//! - `DatabaseService` - block creation and property schema evolution
//! - `RowService` - row lifecycle: create, merge-update, move, delete
//!
//! Services resolve their targets before writing (failing `NotFound`
//! otherwise), wrap read-modify-write sequences in transactions, and perform
//! no authorization: callers check capabilities against the owning space
//! before invoking anything here.

pub mod database_service;
pub mod error;
pub mod row_service;
mod txn;

pub use database_service::{
    CreateDatabaseParams, DatabaseService, UpdateDatabaseParams, UpdatePropertyParams,
};
pub use error::ServiceError;
pub use row_service::{CreateRowParams, MoveRowParams, RowService, UpdateRowParams};
