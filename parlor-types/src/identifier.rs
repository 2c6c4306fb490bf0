//! Stable resource-type identifiers and the composite cache key.

use crate::LocalId;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Computes the persisted 32-bit hash of a type identifier name.
///
/// This is FNV-1a, spelled out rather than taken from std `Hash`: the
/// hash is written into every resource row's `type` field, so it must be
/// identical across processes, platforms, and releases.
#[must_use]
pub fn stable_type_hash(name: &str) -> u32 {
    const FNV_OFFSET: u32 = 0x811c_9dc5;
    const FNV_PRIME: u32 = 0x0100_0193;
    let mut hash = FNV_OFFSET;
    for byte in name.as_bytes() {
        hash ^= u32::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Stable identifier of a resource type: a string name plus its
/// persisted hash, computed once at construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeIdentifier {
    name: String,
    hash: u32,
}

impl TypeIdentifier {
    /// Creates a type identifier from its stable string name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let hash = stable_type_hash(&name);
        Self { name, hash }
    }

    /// Returns the string name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the persisted 32-bit hash of the name.
    #[must_use]
    pub const fn hash(&self) -> u32 {
        self.hash
    }
}

impl fmt::Display for TypeIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// In-process lookup key for the (type, local id) cache index.
///
/// A pure function of the type hash and the local ID. Never persisted
/// and not stable across releases; it only has to be deterministic
/// within one process and collision-free in practice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey(Uuid);

impl CacheKey {
    /// Composes the key by mixing the type hash into the local ID's high
    /// word. The low word is untouched, so distinct local IDs can never
    /// collide regardless of type.
    #[must_use]
    pub fn compose(type_hash: u32, local_id: LocalId) -> Self {
        let (hi, lo) = local_id.as_uuid().as_u64_pair();
        let mixed = hi ^ u64::from(type_hash).wrapping_mul(31);
        Self(Uuid::from_u64_pair(mixed, lo))
    }
}
