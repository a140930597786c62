//! Storage Layer
//!
//! Persistence for database blocks on embedded libsql:
//!
//! - Connection management and idempotent schema initialization
//! - SQL stores for schema containers and their rows
//! - Fractional position key generation for row ordering
//! - Page-number pagination with total-count metadata
//!
//! # Transactions
//!
//! Store methods accept an optional connection. Read-modify-write callers
//! (schema mutation, row create, row move) open an explicit transaction on
//! one connection and pass it through every step, so a failure mid-operation
//! rolls back to the prior state.

mod convert;
mod database_store;
mod error;
mod pagination;
mod position;
mod row_store;
mod storage;

pub use database_store::DatabaseStore;
pub use error::StoreError;
pub use pagination::{PageMeta, Paginated, Pagination};
pub use position::{PositionAllocator, PositionError};
pub use row_store::{RowStore, UpdateRowRecord};
pub use storage::Storage;
