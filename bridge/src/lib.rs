//! # Replication Bridge
//! Keeps a local object graph in sync with a remote entity store: binds
//! store entities to local objects, replicates field deltas in both
//! directions, resolves cross-object references and routes remote procedure
//! calls through per-entity ring buffers.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

#[macro_use]
extern crate cfg_if;

mod bridge;
mod config;
mod constants;
mod invariant;
mod rpc;
mod types;
mod view;
mod world;

pub use bridge::{
    context::BridgeContext,
    error::BridgeError,
    events::{BridgeEvent, DropReason},
    replication_bridge::{CreationStatus, ReplicationBridge, RetirementOptions},
};
pub use config::{BridgeConfig, RpcRingBufferConfig};
pub use constants::{
    is_well_known_component, DEFAULT_DORMANCY_THRESHOLD, DEFAULT_ENTITY_ID_BATCH_SIZE,
    DEFAULT_ENTITY_ID_LOW_WATERMARK, DEFAULT_HISTORY_CAPACITY, DEFAULT_MAX_FIELDS_PER_MESSAGE,
    DEFAULT_RING_BUFFER_SLOTS, DEFAULT_UNRELIABLE_QUEUE_LIMIT, DORMANT_COMPONENT_ID,
    FIRST_SCHEMA_COMPONENT_ID, METADATA_COMPONENT_ID, NET_OWNERSHIP_COMPONENT_ID,
    TOMBSTONE_COMPONENT_ID,
};
pub use rpc::{
    error::{QueueError, RpcError},
    ring_buffer_receiver::{ExtractOutcome, ReceivedRpc, RingBufferReceiver, RpcOrigin},
    ring_buffer_sender::{RingBufferSender, RingBufferSlotState},
    rpc_category::{OverflowPolicy, RingBufferSettings, RpcCategory, RpcId, RpcPayload},
    rpc_queue::{FlushOutcome, PushOutcome, RpcQueue},
};
pub use types::{
    AuthorityDomain, ComponentId, EntityId, FieldHandle, ObjectOffset, ObjectRef, TypeHandle,
};
pub use view::{
    entity_view::{
        AuthorityChange, ComponentChange, EntityDelta, EntityDeltaKind, EntityView,
        RingBufferSnapshot,
    },
    host::ObjectHost,
    schema::{ComponentInfo, ComponentSchema, SchemaResolver},
    wire::{CommandRequest, CommandResponse, WireSender},
};
pub use world::{
    binding::{
        checked_map::CheckedMap,
        creation_data::{CreationData, EntityMetadata, NetOwnership},
        entity_id_pool::EntityIdPool,
        error::BindingError,
        object_binding_table::{ObjectBindingTable, ObjectClaim},
        pending_subobject::PendingSubobject,
    },
    channel::{
        changelist_history::ChangelistHistory,
        error::ChannelError,
        object_replicator::ObjectReplicator,
        replication_channel::{
            AuthorityFlags, ChannelState, CloseReason, ObjectDelta, RemovedSubobject,
            ReplicationChannel, ReplicationOutput,
        },
    },
    component::{
        change_tracker::ChangeTracker,
        changelist::Changelist,
        component_data::{ComponentData, ReplicationCategory},
        diff_mask::DiffMask,
        error::ComponentError,
        field::{
            FieldDescriptor, FieldKind, FieldLayout, FieldPath, FieldValue, RepNotifyCondition,
        },
        shadow_state::ShadowState,
    },
    object::arena::{ObjectArena, ObjectHandle},
    reference::reference_resolver::{
        outgoing_value, ReferenceResolver, ResolutionOutcome, ResolvedFields,
    },
};
