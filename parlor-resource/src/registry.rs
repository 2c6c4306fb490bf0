//! Catalog of registered resource types, keyed by identifier hash.

use crate::{ConfigurationError, ResourceType};
use parlor_types::stable_type_hash;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// The resource-type catalog.
///
/// Populated from an explicit list during startup and effectively
/// immutable afterwards — there is no unregistration.
#[derive(Default)]
pub struct TypeRegistry {
    by_hash: HashMap<u32, Arc<dyn ResourceType>>,
    order: Vec<Arc<dyn ResourceType>>,
}

impl TypeRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a type. A second type whose identifier hashes to an
    /// already-registered value is a fatal configuration error.
    pub fn register(&mut self, ty: Arc<dyn ResourceType>) -> Result<(), ConfigurationError> {
        let identifier = ty.identifier().clone();
        if self.by_hash.contains_key(&identifier.hash()) {
            return Err(ConfigurationError::DuplicateTypeId {
                identifier: identifier.name().to_string(),
                hash: identifier.hash(),
            });
        }
        self.by_hash.insert(identifier.hash(), Arc::clone(&ty));
        self.order.push(ty);
        info!(resource_type = %identifier, hash = identifier.hash(), "registered resource type");
        Ok(())
    }

    /// O(1) lookup by stored identifier hash.
    #[must_use]
    pub fn get_by_hash(&self, hash: u32) -> Option<Arc<dyn ResourceType>> {
        self.by_hash.get(&hash).cloned()
    }

    /// O(1) lookup by identifier name.
    #[must_use]
    pub fn get_by_name(&self, name: &str) -> Option<Arc<dyn ResourceType>> {
        self.get_by_hash(stable_type_hash(name))
    }

    /// All registered types, in registration order.
    #[must_use]
    pub fn types(&self) -> &[Arc<dyn ResourceType>] {
        &self.order
    }

    /// Number of registered types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether no types are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
