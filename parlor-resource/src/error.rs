//! Error taxonomy for the resource core.

use parlor_db::DbError;
use parlor_types::{LocalId, UniversalId};
use thiserror::Error;

/// Result type for resource operations.
pub type ResourceResult<T> = Result<T, ResourceError>;

/// Diagnostic reported by a type's save or load hook.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct HookError {
    message: String,
}

impl HookError {
    /// Creates a hook diagnostic.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Errors that can occur in resource operations.
///
/// Absence (`NotFound*`) is distinct from every failure mode; callers
/// never have to disambiguate a bare null.
#[derive(Debug, Error)]
pub enum ResourceError {
    /// No backing row for the given universal id.
    #[error("no resource row for id {0}")]
    NotFound(UniversalId),

    /// No backing row for the given (type, local id) pair.
    #[error("no '{type_name}' resource row for local id {local_id}")]
    NotFoundLocal {
        type_name: String,
        local_id: LocalId,
    },

    /// The stored type hash has no registered type.
    #[error("stored type hash {0:#010x} has no registered resource type")]
    UnknownType(u32),

    /// The type's load hook reported a failure.
    #[error("load hook for '{type_name}' failed: {source}")]
    Load {
        type_name: String,
        source: HookError,
    },

    /// The type's save hook reported a failure.
    #[error("save hook for '{type_name}' failed: {source}")]
    Save {
        type_name: String,
        source: HookError,
    },

    /// A backing row missing or garbling a reserved field.
    #[error("invalid resource row: {0}")]
    InvalidRecord(String),

    /// The underlying store operation failed.
    #[error("store operation failed: {0}")]
    Db(#[from] DbError),

    /// A worker task was aborted or panicked before completing.
    #[error("worker task failed: {0}")]
    Task(String),
}

/// Startup configuration errors. These are fatal: the server refuses to
/// come up with an inconsistent type catalog.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// Two registered types share one identifier hash.
    #[error("duplicate resource type identifier '{identifier}' (hash {hash:#010x})")]
    DuplicateTypeId { identifier: String, hash: u32 },
}
