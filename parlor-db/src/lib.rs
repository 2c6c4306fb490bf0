//! Document-store seam for the Parlor resource core.
//!
//! The resource manager talks to storage exclusively through the types in
//! this crate:
//!
//! - [`Document`] — one JSON row with typed field access
//! - [`DatabaseItem`] — a row bound to its collection and key field,
//!   pushable back to the store
//! - [`Database`] / [`Session`] — the backend contract; a session is the
//!   single-caller execution context (cursor/connection state) that query
//!   pools fork around
//! - [`QueryPool`] — named, pre-registered backend operations with a
//!   shared catalog and per-fork execution state
//!
//! Two backends are provided: [`MemoryDatabase`] for tests and
//! development, and [`SqliteDatabase`] for a durable single-file store.
//! Both implement `find_or_insert` as a backend-atomic operation guarded
//! by a uniqueness constraint on the key field.

mod database;
mod document;
mod error;
mod item;
mod memory;
mod query;
mod sqlite;

pub use database::{Credentials, Database, DatabaseKind, Session};
pub use document::Document;
pub use error::{DbError, DbResult};
pub use item::DatabaseItem;
pub use memory::MemoryDatabase;
pub use query::{BoundPool, Params, QueryCtx, QueryPool};
pub use sqlite::SqliteDatabase;
