//! The backend contract: databases hand out single-caller sessions.

use crate::{DbResult, Document};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The backend kind a query definition targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DatabaseKind {
    /// In-process store, used by tests and development setups.
    Memory,
    /// Single-file SQLite store.
    Sqlite,
}

impl fmt::Display for DatabaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => write!(f, "memory"),
            Self::Sqlite => write!(f, "sqlite"),
        }
    }
}

/// Login credentials for a backend.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// A backing document store.
///
/// The database handle itself is shared freely between tasks; all actual
/// I/O goes through [`Session`]s, which are **not** safe for concurrent
/// unsynchronized use and are therefore owned one-per-fork by query
/// pools.
pub trait Database: Send + Sync {
    /// The backend kind, matched against query definition tags.
    fn kind(&self) -> DatabaseKind;

    /// Authenticates against the backend.
    fn login(&self, credentials: &Credentials) -> DbResult<()>;

    /// Opens a fresh execution context (connection/cursor state).
    fn open_session(&self) -> DbResult<Box<dyn Session>>;
}

/// One execution context against a [`Database`].
///
/// All primitives operate on named collections of [`Document`]s keyed by
/// a caller-chosen key field. `find_or_insert` is backend-atomic under a
/// uniqueness constraint on that field: two concurrent callers for the
/// same absent key observe exactly one created row.
pub trait Session: Send {
    /// Returns the first document whose fields equal every field of
    /// `filter`, or `None` if absent.
    fn find_one(&mut self, collection: &str, filter: &Document) -> DbResult<Option<Document>>;

    /// Inserts a document. The key field must be present in `doc`.
    fn insert_one(&mut self, collection: &str, key_field: &str, doc: &Document) -> DbResult<()>;

    /// Returns the document with `key_field == key`, creating it from
    /// `template` (with the key stamped in) when absent. Atomic: never
    /// implemented as a separate check followed by an insert.
    fn find_or_insert(
        &mut self,
        collection: &str,
        key_field: &str,
        key: &str,
        template: &Document,
    ) -> DbResult<Document>;

    /// Replaces the document with the same key, inserting when absent.
    /// The key field must be present in `doc`.
    fn replace_one(&mut self, collection: &str, key_field: &str, doc: &Document) -> DbResult<()>;
}
