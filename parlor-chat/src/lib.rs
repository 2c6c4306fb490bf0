//! Chat resources for the Parlor server.
//!
//! Concrete [`parlor_resource::ResourceType`] implementations that plug
//! into the resource manager. Currently one: the channel message.

mod message;

pub use message::{ChannelMessage, ChannelMessageType, CHANNEL_MESSAGE_TYPE};
