//! Service Layer Error Types
//!
//! Every service operation fails with one of three signalable kinds -
//! `NotFound`, `InvalidState`, `Conflict` - or with an infrastructure
//! failure passed through from the storage layer. The transport layer owns
//! the mapping to protocol status codes (404 / 400 / 409, storage as 500);
//! nothing is retried or swallowed here.

use crate::db::{PositionError, StoreError};
use thiserror::Error;

/// Service operation errors
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Target entity absent or tombstoned
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A schema invariant would be violated (e.g. deleting the last property)
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// An identifier collided on insert
    #[error("conflict: {0}")]
    Conflict(String),

    /// Storage operation failed
    #[error("storage operation failed: {0}")]
    Store(#[from] StoreError),

    /// Position key allocation failed
    #[error("position allocation failed: {0}")]
    Position(#[from] PositionError),
}

impl ServiceError {
    /// Create a database not found error
    pub fn database_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "database",
            id: id.into(),
        }
    }

    /// Create a row not found error
    pub fn row_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "database row",
            id: id.into(),
        }
    }

    /// Create a property not found error
    pub fn property_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "property",
            id: id.into(),
        }
    }

    /// Create an invalid state error
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    /// Create a conflict error
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Re-map an insert failure so uniqueness violations surface as conflicts
    pub fn from_insert(error: StoreError) -> Self {
        match error {
            StoreError::UniqueViolation { context } => Self::Conflict(context),
            other => Self::Store(other),
        }
    }
}
