//! Resource and resource-type contracts.

use crate::{HookError, ResourceManager};
use parlor_db::DatabaseItem;
use parlor_types::{LocalId, TypeIdentifier, UniversalId};
use std::any::Any;
use std::sync::Arc;

/// A resource instance shared between the cache and its users.
pub type SharedResource = Arc<dyn Resource>;

/// One cached/persisted entity.
///
/// Instances are shared as [`SharedResource`] across worker tasks, so
/// mutable domain state lives behind interior mutability inside the
/// concrete type.
pub trait Resource: Send + Sync {
    /// The id unique across all types and instances.
    fn universal_id(&self) -> UniversalId;

    /// The id unique within the owning type's namespace.
    fn local_id(&self) -> LocalId;

    /// The persisted hash of the owning type's identifier.
    fn type_hash(&self) -> u32;

    /// Downcast support for type hooks.
    fn as_any(&self) -> &dyn Any;
}

/// Pluggable descriptor for one category of resource.
///
/// Types are registered once at startup; the registry rejects duplicate
/// identifier hashes as a configuration error.
pub trait ResourceType: Send + Sync {
    /// The stable identifier of this type.
    fn identifier(&self) -> &TypeIdentifier;

    /// Constructs an empty instance carrying both ids. Domain fields are
    /// populated afterwards by [`ResourceType::load_resource`] or by
    /// application code.
    fn new_instance(&self, universal_id: UniversalId, local_id: LocalId) -> SharedResource;

    /// Writes the resource's current field values into the item.
    ///
    /// Must be idempotent: saving an unchanged resource twice yields an
    /// unchanged persisted representation.
    fn save_resource(
        &self,
        manager: &ResourceManager,
        item: &mut DatabaseItem,
        resource: &dyn Resource,
    ) -> Result<(), HookError>;

    /// Populates a freshly constructed instance from the item.
    ///
    /// Returns an explicit outcome so the manager can distinguish
    /// "loaded" from "corrupt or incompatible record" — a partial load
    /// must fail, never succeed silently.
    fn load_resource(
        &self,
        manager: &ResourceManager,
        item: &DatabaseItem,
        resource: &dyn Resource,
    ) -> Result<(), HookError>;
}
