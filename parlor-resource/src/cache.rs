//! Dual-index cache of loaded resources.

use crate::{Resource, SharedResource};
use parlor_types::{CacheKey, LocalId, UniversalId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Indexes {
    by_universal: HashMap<UniversalId, SharedResource>,
    by_local: HashMap<CacheKey, SharedResource>,
}

/// In-memory map of loaded resources, indexed by universal id and by
/// the (type, local id) composite key.
///
/// Both indexes live behind one mutex, and every mutation updates both
/// inside a single critical section: a resource is visible through one
/// index if and only if it is visible through the other, at any point
/// any observer can see. Two independently locked maps would open a
/// window where only one index has the entry.
#[derive(Default)]
pub struct ResourceCache {
    inner: Mutex<Indexes>,
}

impl ResourceCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a resource into both indexes as one atomic unit.
    pub fn insert(&self, resource: SharedResource) {
        let key = CacheKey::compose(resource.type_hash(), resource.local_id());
        let mut inner = self.inner.lock().unwrap();
        inner
            .by_universal
            .insert(resource.universal_id(), Arc::clone(&resource));
        inner.by_local.insert(key, resource);
    }

    /// Removes a resource from both indexes as one atomic unit.
    pub fn remove(&self, resource: &dyn Resource) {
        let key = CacheKey::compose(resource.type_hash(), resource.local_id());
        let mut inner = self.inner.lock().unwrap();
        inner.by_universal.remove(&resource.universal_id());
        inner.by_local.remove(&key);
    }

    /// O(1) lookup by universal id. No backend access.
    #[must_use]
    pub fn get_universal(&self, id: UniversalId) -> Option<SharedResource> {
        self.inner.lock().unwrap().by_universal.get(&id).cloned()
    }

    /// O(1) lookup by (type hash, local id). No backend access.
    #[must_use]
    pub fn get_local(&self, type_hash: u32, local_id: LocalId) -> Option<SharedResource> {
        let key = CacheKey::compose(type_hash, local_id);
        self.inner.lock().unwrap().by_local.get(&key).cloned()
    }

    /// Number of loaded resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().by_universal.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
