//! Error types for the document store seam.

use crate::DatabaseKind;
use thiserror::Error;

/// Result type for store operations.
pub type DbResult<T> = Result<T, DbError>;

/// Errors that can occur in store operations.
#[derive(Debug, Error)]
pub enum DbError {
    /// Database error from SQLite.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A query name with no registered definition.
    #[error("unknown query: {0}")]
    UnknownQuery(String),

    /// A query definition targeting a different backend kind.
    #[error("query '{name}' targets {expected} but database is {actual}")]
    KindMismatch {
        name: String,
        expected: DatabaseKind,
        actual: DatabaseKind,
    },

    /// Login was rejected by the backend.
    #[error("login rejected: {0}")]
    LoginRejected(String),

    /// Collection names are restricted to `[A-Za-z0-9_]`.
    #[error("invalid collection name: {0}")]
    InvalidCollection(String),

    /// Filter field names are restricted to `[A-Za-z0-9_]`.
    #[error("invalid field name: {0}")]
    InvalidField(String),

    /// A generic backend failure.
    #[error("backend error: {0}")]
    Backend(String),
}
