//! Core identifier types for the Parlor resource subsystem.
//!
//! This crate defines the plain, domain-agnostic identity vocabulary used
//! by the resource manager and the document store seam:
//! - Universal and local resource identifiers (UUID newtypes)
//! - Stable resource-type identifiers and their persisted 32-bit hash
//! - The in-process composite cache key for (type, local id) lookups
//!
//! Domain-specific resource shapes (channel messages, channels, users)
//! belong to their own crates, not here.

mod identifier;
mod ids;

pub use identifier::{CacheKey, TypeIdentifier, stable_type_hash};
pub use ids::{LocalId, UniversalId};
