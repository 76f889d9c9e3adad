use crate::{
    rpc::{error::QueueError, rpc_category::RpcCategory},
    world::channel::error::ChannelError,
    AuthorityDomain, EntityId, ObjectHandle, ObjectOffset,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DropReason {
    /// The changelist holds more fields than one wire message accepts
    OversizedChangelist { fields: usize, limit: usize },
    /// No local object is bound to the entity
    UnboundEntity,
    /// This worker is authoritative and doesn't accept remote writes
    NotPermitted,
    /// A payload value didn't match the field layout
    SchemaMismatch,
}

/// Notable things that happened during bridge processing, drained by the
/// host with `ReplicationBridge::take_events`
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BridgeEvent {
    EntityBound {
        entity: EntityId,
        handle: ObjectHandle,
    },
    EntityUnbound {
        entity: EntityId,
        retained: bool,
    },
    /// The entity's metadata didn't resolve to a local type; retried when
    /// new metadata arrives
    TypeUnresolved { entity: EntityId },
    SubobjectAttached {
        entity: EntityId,
        offset: ObjectOffset,
        handle: ObjectHandle,
    },
    AuthorityChanged {
        entity: EntityId,
        domain: AuthorityDomain,
        authoritative: bool,
    },
    UpdateDropped {
        entity: EntityId,
        offset: ObjectOffset,
        reason: DropReason,
    },
    ProtocolViolation {
        entity: EntityId,
        error: ChannelError,
    },
    RpcQueueError {
        entity: EntityId,
        category: RpcCategory,
        error: QueueError,
    },
    /// A queued call was dropped to make room under the drop-oldest policy
    RpcDropped {
        entity: EntityId,
        category: RpcCategory,
    },
    /// Queued calls discarded because their entity went away
    RpcsDiscarded { entity: EntityId, count: usize },
    LocalEntityAssigned {
        entity: EntityId,
        handle: ObjectHandle,
    },
    EntityCreationFailed { entity: EntityId },
    WentDormant { entity: EntityId },
}
