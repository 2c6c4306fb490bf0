//! The Parlor resource core: a type-polymorphic cache/persistence
//! bridge between in-memory resource objects and a document store.
//!
//! Connection workers ask the [`ResourceManager`] for resources by
//! universal id or by (type, local id). Cache hits return the shared
//! instance directly; misses run a named query through a forked
//! [`parlor_db::QueryPool`], resolve the stored type hash through the
//! [`TypeRegistry`], and let the type's hooks populate a fresh instance
//! before it lands in the dual-index [`ResourceCache`].
//!
//! # Persistence contract
//!
//! Saving is always explicit. [`ResourceManager::unload_resource`]
//! removes the instance from the cache and **does not write anything**:
//! in-memory mutations that were never saved are gone after an unload.
//! This manual-flush contract is deliberate — callers that mutate a
//! resource own the decision of when (and whether) it hits storage.
//!
//! # Concurrency
//!
//! Three guarantees hold under concurrent use:
//! - cache inserts/removals update both indexes in one critical section,
//! - per-id loads are single-flighted (N concurrent loaders for one
//!   uncached id cost one backend fetch and share one instance),
//! - find-or-create is a backend-atomic upsert, never check-then-insert.
//!
//! The cache is single-process: rows mutated by another process stay
//! stale here until explicitly reloaded. That is an accepted tradeoff,
//! not something callers should try to patch around silently.

mod cache;
mod error;
mod manager;
mod registry;
mod resource;

pub use cache::ResourceCache;
pub use error::{ConfigurationError, HookError, ResourceError, ResourceResult};
pub use manager::{LocalQueryPool, ResourceManager};
pub use registry::TypeRegistry;
pub use resource::{Resource, ResourceType, SharedResource};
