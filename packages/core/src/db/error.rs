//! Storage Error Types
//!
//! Error types for the storage layer: connection and schema initialization
//! failures, SQL execution failures, and the uniqueness violation that the
//! service layer surfaces as a conflict.

use std::path::PathBuf;
use thiserror::Error;

/// Storage layer errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to establish database connection
    #[error("failed to connect to database at {path}: {source}")]
    ConnectionFailed {
        path: PathBuf,
        source: libsql::Error,
    },

    /// Failed to create parent directory for the database file
    #[error("failed to create parent directory for database: {0}")]
    DirectoryCreationFailed(#[from] std::io::Error),

    /// SQL execution error with context
    #[error("sql execution failed: {context}")]
    Sql { context: String },

    /// A uniqueness constraint was violated on insert.
    ///
    /// Kept distinct from [`StoreError::Sql`] so callers can surface it as a
    /// conflict instead of a generic storage failure.
    #[error("unique constraint violated: {context}")]
    UniqueViolation { context: String },

    /// A stored column could not be decoded back into its model type
    #[error("corrupt stored value: {context}")]
    Corrupt { context: String },
}

impl StoreError {
    /// Create a connection failed error
    pub fn connection_failed(path: PathBuf, source: libsql::Error) -> Self {
        Self::ConnectionFailed { path, source }
    }

    /// Create a SQL execution error with context
    pub fn sql(context: impl Into<String>) -> Self {
        Self::Sql {
            context: context.into(),
        }
    }

    /// Create a corrupt stored value error
    pub fn corrupt(context: impl Into<String>) -> Self {
        Self::Corrupt {
            context: context.into(),
        }
    }

    /// Classify an insert failure, separating uniqueness violations from
    /// other SQL errors.
    pub fn from_insert(context: impl Into<String>, source: libsql::Error) -> Self {
        let message = source.to_string();
        if message.contains("UNIQUE constraint failed") {
            Self::UniqueViolation {
                context: format!("{}: {}", context.into(), message),
            }
        } else {
            Self::Sql {
                context: format!("{}: {}", context.into(), message),
            }
        }
    }
}
