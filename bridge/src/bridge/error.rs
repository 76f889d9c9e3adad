use thiserror::Error;

use crate::{
    rpc::error::{QueueError, RpcError},
    world::{binding::error::BindingError, channel::error::ChannelError},
};

/// Errors returned by the ReplicationBridge's public entry points
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    #[error("Entity {entity_id} is not bound to a local object")]
    EntityNotBound { entity_id: String },

    #[error("Cannot {operation} entity {entity_id} without {domain} authority")]
    NotAuthoritative {
        entity_id: String,
        domain: String,
        operation: &'static str,
    },

    #[error("Type {type_handle} has no field layout")]
    UnknownType { type_handle: u32 },

    #[error("Host refused to create an object of type {type_handle}")]
    HostRefused { type_handle: u32 },

    #[error(transparent)]
    Binding(#[from] BindingError),

    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error(transparent)]
    Queue(#[from] QueueError),
}
