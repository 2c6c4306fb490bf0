//! The channel message resource.

use parlor_db::DatabaseItem;
use parlor_resource::{HookError, Resource, ResourceManager, ResourceType, SharedResource};
use parlor_types::{LocalId, TypeIdentifier, UniversalId, stable_type_hash};
use std::any::Any;
use std::sync::{Arc, RwLock};

/// Identifier name of the channel message type.
pub const CHANNEL_MESSAGE_TYPE: &str = "channel_message";

/// Persisted field holding the raw message text.
const FIELD_CONTENT_RAW: &str = "content_raw";

/// One message posted to a channel.
///
/// The raw content is interior-mutable so a shared instance can be
/// edited in place; edits reach storage only through an explicit save.
pub struct ChannelMessage {
    universal_id: UniversalId,
    local_id: LocalId,
    type_hash: u32,
    content_raw: RwLock<String>,
}

impl ChannelMessage {
    /// Creates an empty message with the given identity.
    #[must_use]
    pub fn new(universal_id: UniversalId, local_id: LocalId) -> Self {
        Self {
            universal_id,
            local_id,
            type_hash: stable_type_hash(CHANNEL_MESSAGE_TYPE),
            content_raw: RwLock::new(String::new()),
        }
    }

    /// The raw message text.
    #[must_use]
    pub fn content(&self) -> String {
        self.content_raw.read().unwrap().clone()
    }

    /// Replaces the raw message text in memory.
    pub fn set_content(&self, content: impl Into<String>) {
        *self.content_raw.write().unwrap() = content.into();
    }
}

impl Resource for ChannelMessage {
    fn universal_id(&self) -> UniversalId {
        self.universal_id
    }

    fn local_id(&self) -> LocalId {
        self.local_id
    }

    fn type_hash(&self) -> u32 {
        self.type_hash
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Type descriptor for [`ChannelMessage`], registered with the manager
/// at server startup.
pub struct ChannelMessageType {
    identifier: TypeIdentifier,
}

impl ChannelMessageType {
    #[must_use]
    pub fn new() -> Arc<dyn ResourceType> {
        Arc::new(Self {
            identifier: TypeIdentifier::new(CHANNEL_MESSAGE_TYPE),
        })
    }
}

impl ResourceType for ChannelMessageType {
    fn identifier(&self) -> &TypeIdentifier {
        &self.identifier
    }

    fn new_instance(&self, universal_id: UniversalId, local_id: LocalId) -> SharedResource {
        Arc::new(ChannelMessage::new(universal_id, local_id))
    }

    fn save_resource(
        &self,
        _manager: &ResourceManager,
        item: &mut DatabaseItem,
        resource: &dyn Resource,
    ) -> Result<(), HookError> {
        let message = downcast(resource)?;
        item.set(FIELD_CONTENT_RAW, message.content());
        Ok(())
    }

    fn load_resource(
        &self,
        _manager: &ResourceManager,
        item: &DatabaseItem,
        resource: &dyn Resource,
    ) -> Result<(), HookError> {
        let message = downcast(resource)?;
        // Rows created by find-or-create carry no content yet.
        if let Some(content) = item.get_str(FIELD_CONTENT_RAW) {
            message.set_content(content);
        }
        Ok(())
    }
}

fn downcast(resource: &dyn Resource) -> Result<&ChannelMessage, HookError> {
    resource
        .as_any()
        .downcast_ref::<ChannelMessage>()
        .ok_or_else(|| HookError::new("resource is not a ChannelMessage"))
}
