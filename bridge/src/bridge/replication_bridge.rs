use std::collections::{HashMap, HashSet, VecDeque};

use log::{debug, info, trace, warn};

use crate::{
    bridge::{
        context::BridgeContext,
        error::BridgeError,
        events::BridgeEvent,
    },
    config::BridgeConfig,
    constants::{DORMANT_COMPONENT_ID, TOMBSTONE_COMPONENT_ID},
    rpc::{
        error::QueueError,
        ring_buffer_receiver::{ReceivedRpc, RingBufferReceiver},
        ring_buffer_sender::{RingBufferSender, RingBufferSlotState},
        rpc_category::{RpcCategory, RpcPayload},
        rpc_queue::{FlushOutcome, PushOutcome, RpcQueue},
    },
    view::{
        entity_view::{AuthorityChange, ComponentChange, EntityDeltaKind},
        wire::CommandRequest,
    },
    world::{
        binding::{
            entity_id_pool::EntityIdPool, error::BindingError,
            object_binding_table::ObjectBindingTable,
        },
        channel::replication_channel::{ChannelState, CloseReason, ReplicationChannel},
        component::{change_tracker::ChangeTracker, component_data::ComponentData},
        reference::reference_resolver::ReferenceResolver,
    },
    AuthorityDomain, EntityId, ObjectHandle, ObjectOffset, ObjectRef, SchemaResolver, TypeHandle,
};

/// Result of announcing a locally created object
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CreationStatus {
    /// An entity id was available and the object is bound to it
    Assigned(EntityId),
    /// The object waits for the next entity id reservation
    Pending,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RetirementOptions {
    /// Mark the entity with a tombstone instead of deleting it, so that
    /// late-joining workers destroy their copy of the matching well-known
    /// object
    pub tombstone: bool,
}

/// Synchronizes a local object graph with a remote entity store.
///
/// Each call to [`replicate_tick`](Self::replicate_tick) consumes the view's
/// deltas since the previous tick in a fixed order (authority losses,
/// removals, component changes, additions, authority gains), then pushes
/// outgoing replication for authoritative channels and routes RPCs.
pub struct ReplicationBridge<P: RpcPayload> {
    pub(super) config: BridgeConfig,
    pub(super) bindings: ObjectBindingTable,
    pub(super) resolver: ReferenceResolver,
    pub(super) channels: HashMap<EntityId, ReplicationChannel>,
    pub(super) trackers: HashMap<TypeHandle, ChangeTracker>,
    pub(super) entity_ids: EntityIdPool,
    pub(super) entity_ids_in_use: bool,
    pub(super) pending_creations: VecDeque<(TypeHandle, ObjectHandle)>,
    pub(super) unresolved_entities: HashSet<EntityId>,
    pub(super) rpc_sender: RingBufferSender<P>,
    pub(super) rpc_receiver: RingBufferReceiver<P>,
    pub(super) rpc_queue: RpcQueue<P>,
    pub(super) rpc_dirty: HashSet<EntityId>,
    pub(super) received_rpcs: Vec<ReceivedRpc<P>>,
    pub(super) events: Vec<BridgeEvent>,
}

impl<P: RpcPayload> ReplicationBridge<P> {
    /// Create a new ReplicationBridge
    pub fn new(config: BridgeConfig) -> Self {
        let entity_ids = EntityIdPool::new(config.entity_id_low_watermark, config.entity_id_batch_size);
        let rpc_sender = RingBufferSender::new(&config.rpc);
        let rpc_receiver = RingBufferReceiver::new(&config.rpc);
        let rpc_queue = RpcQueue::new(&config.rpc);

        Self {
            config,
            bindings: ObjectBindingTable::new(),
            resolver: ReferenceResolver::new(),
            channels: HashMap::new(),
            trackers: HashMap::new(),
            entity_ids,
            entity_ids_in_use: false,
            pending_creations: VecDeque::new(),
            unresolved_entities: HashSet::new(),
            rpc_sender,
            rpc_receiver,
            rpc_queue,
            rpc_dirty: HashSet::new(),
            received_rpcs: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    // Tick

    /// Processes every delta the view accumulated since the previous tick,
    /// then replicates outgoing state and routes RPCs.
    pub fn replicate_tick(&mut self, ctx: &mut BridgeContext<'_, P>) {
        let view = ctx.view;
        let deltas = view.deltas_since_last_tick();

        // collect
        let mut authority_lost: Vec<(EntityId, AuthorityDomain)> = Vec::new();
        let mut authority_gained: Vec<(EntityId, AuthorityDomain)> = Vec::new();
        let mut removed: Vec<EntityId> = Vec::new();
        let mut temporarily_removed: Vec<EntityId> = Vec::new();
        let mut added: Vec<EntityId> = Vec::new();
        let mut component_changes: Vec<(EntityId, &ComponentChange)> = Vec::new();

        for delta in deltas {
            for change in delta.authority_changes.iter() {
                match change {
                    AuthorityChange::Lost(domain) => authority_lost.push((delta.entity, *domain)),
                    AuthorityChange::Gained(domain) => authority_gained.push((delta.entity, *domain)),
                }
            }
            match delta.kind {
                EntityDeltaKind::Add => added.push(delta.entity),
                EntityDeltaKind::Remove => removed.push(delta.entity),
                EntityDeltaKind::TemporarilyRemoved => temporarily_removed.push(delta.entity),
                EntityDeltaKind::Update => {
                    for change in delta.component_changes.iter() {
                        component_changes.push((delta.entity, change));
                    }
                }
            }
        }

        // apply
        for (entity, domain) in authority_lost {
            self.on_authority_lost(entity, domain, ctx);
        }
        for entity in removed {
            self.on_entity_removed(entity, ctx);
        }
        for entity in temporarily_removed {
            self.on_entity_temporarily_removed(entity, ctx);
        }
        for (entity, change) in component_changes {
            self.on_component_change(entity, change, ctx);
        }
        for entity in added {
            self.on_entity_added(entity, ctx);
        }
        for (entity, domain) in authority_gained {
            self.on_authority_gained(entity, domain, ctx);
        }

        self.replicate_outgoing(ctx);
        self.process_rpcs(ctx);
    }

    // Local creation

    /// Announces an object created locally that should become a new entity.
    /// It is bound immediately when an entity id is available, otherwise it
    /// waits for the next reservation.
    pub fn notify_local_object_created(
        &mut self,
        type_handle: TypeHandle,
        handle: ObjectHandle,
        ctx: &mut BridgeContext<'_, P>,
    ) -> Result<CreationStatus, BridgeError> {
        if let Some(object_ref) = self.bindings.object_ref(handle) {
            return Err(BridgeError::Binding(BindingError::ObjectAlreadyBound {
                handle: handle.to_string(),
                object_ref: object_ref.to_string(),
            }));
        }
        if self.pending_creations.iter().any(|(_, pending)| *pending == handle) {
            return Ok(CreationStatus::Pending);
        }
        self.ensure_tracker(type_handle, ctx.schema)?;
        self.entity_ids_in_use = true;

        let status = match self.entity_ids.take() {
            Some(entity) => {
                self.begin_local_creation(entity, type_handle, handle, ctx)?;
                CreationStatus::Assigned(entity)
            }
            None => {
                debug!("{} waits for an entity id", handle);
                self.pending_creations.push_back((type_handle, handle));
                CreationStatus::Pending
            }
        };
        self.request_entity_ids_if_needed(ctx);

        Ok(status)
    }

    /// Attaches a locally created sub-object to an entity this worker is
    /// authoritative over. It is sent as component adds on the next pass.
    pub fn attach_local_subobject(
        &mut self,
        entity: EntityId,
        offset: ObjectOffset,
        type_handle: TypeHandle,
        handle: ObjectHandle,
        ctx: &mut BridgeContext<'_, P>,
    ) -> Result<(), BridgeError> {
        self.authoritative_channel(entity, "attach a sub-object to")?;
        self.ensure_tracker(type_handle, ctx.schema)?;
        self.bind_subobject(entity, offset, handle, type_handle, true)?;
        debug!("attached local sub-object {} to entity {} at {}", handle, entity, offset);
        Ok(())
    }

    // Retirement

    /// Retires an entity this worker is authoritative over: the store entity
    /// is deleted (or tombstoned) and every local reference to it is
    /// dropped for good.
    pub fn request_entity_retirement(
        &mut self,
        entity: EntityId,
        options: RetirementOptions,
        ctx: &mut BridgeContext<'_, P>,
    ) -> Result<(), BridgeError> {
        self.authoritative_channel(entity, "retire")?;

        if options.tombstone {
            ctx.wire
                .send_component_add(entity, ComponentData::new(TOMBSTONE_COMPONENT_ID));
        } else {
            ctx.wire
                .send_command_request(CommandRequest::DeleteEntity { entity });
        }

        self.drop_rpc_state(entity);
        if let Some(mut channel) = self.channels.remove(&entity) {
            channel.close(CloseReason::Destroyed);
        }
        for (offset, handle) in self.bindings.unbind_entity(entity) {
            self.resolver
                .on_reference_destroyed(ObjectRef::new(entity, offset));
            self.resolver.remove_object(handle);
        }
        self.events.push(BridgeEvent::EntityUnbound {
            entity,
            retained: false,
        });
        info!("retired entity {}", entity);

        Ok(())
    }

    /// Stops replicating the entity in either direction. The local objects
    /// stay alive and no further rep-notifies fire for them.
    pub fn tear_off(&mut self, entity: EntityId) -> Result<(), BridgeError> {
        let Some(channel) = self.channels.get_mut(&entity) else {
            return Err(BridgeError::EntityNotBound {
                entity_id: entity.to_string(),
            });
        };
        channel.close(CloseReason::TornOff);
        for (_, handle) in self.bindings.objects_of_entity(entity) {
            self.resolver.mark_finalized(handle);
        }
        self.drop_rpc_state(entity);
        info!("tore off entity {}", entity);
        Ok(())
    }

    // Dormancy

    /// Asks the channel to go dormant once its objects stop changing
    pub fn request_dormancy(&mut self, entity: EntityId) -> Result<(), BridgeError> {
        let channel = self.authoritative_channel(entity, "request dormancy of")?;
        channel.request_dormancy();
        Ok(())
    }

    /// Brings a dormant channel back. Changes made while dormant go out on
    /// the next pass.
    pub fn wake_from_dormancy(
        &mut self,
        entity: EntityId,
        ctx: &mut BridgeContext<'_, P>,
    ) -> Result<(), BridgeError> {
        let channel = self.authoritative_channel(entity, "wake")?;
        if !channel.is_dormant() {
            return Ok(());
        }
        channel.activate()?;
        ctx.wire.send_component_remove(entity, DORMANT_COMPONENT_ID);
        info!("entity {} woke from dormancy", entity);
        Ok(())
    }

    // RPCs

    /// Queues a call for the entity and immediately tries to flush the
    /// entity's queues into their ring buffers.
    pub fn send_rpc(
        &mut self,
        entity: EntityId,
        category: RpcCategory,
        payload: P,
        ctx: &mut BridgeContext<'_, P>,
    ) -> Result<(), QueueError> {
        match self.rpc_queue.push(entity, category, payload) {
            Ok(PushOutcome::Queued) => {}
            Ok(PushOutcome::DroppedOldest) => {
                warn!("dropped the oldest queued {:?} call for entity {}", category, entity);
                self.events.push(BridgeEvent::RpcDropped { entity, category });
            }
            Err(error) => {
                warn!("cannot queue {:?} call for entity {}: {}", category, entity, error);
                self.events.push(BridgeEvent::RpcQueueError {
                    entity,
                    category,
                    error,
                });
                return Err(error);
            }
        }
        self.flush_rpc_queue_for_entity(entity, ctx);
        Ok(())
    }

    /// Writes as many queued calls for the entity as its ring buffers have
    /// room for
    pub fn flush_rpc_queue_for_entity(
        &mut self,
        entity: EntityId,
        ctx: &mut BridgeContext<'_, P>,
    ) -> FlushOutcome {
        if !self.can_send_rpcs(entity) {
            return FlushOutcome::default();
        }
        let events = &mut self.events;
        self.rpc_queue.flush_for_entity(
            entity,
            &mut self.rpc_sender,
            ctx.wire,
            &mut |category, error| {
                events.push(BridgeEvent::RpcQueueError {
                    entity,
                    category,
                    error,
                })
            },
            &mut |id| trace!("rpc {:?} written for entity {}", id, entity),
        )
    }

    pub fn take_received_rpcs(&mut self) -> Vec<ReceivedRpc<P>> {
        std::mem::take(&mut self.received_rpcs)
    }

    pub fn queued_rpcs(&self, entity: EntityId, category: RpcCategory) -> usize {
        self.rpc_queue.len(entity, category)
    }

    pub fn rpc_sender_state(
        &self,
        entity: EntityId,
        category: RpcCategory,
    ) -> Option<RingBufferSlotState> {
        self.rpc_sender.state(entity, category)
    }

    // Queries

    pub fn take_events(&mut self) -> Vec<BridgeEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn object(&self, object_ref: ObjectRef) -> Option<ObjectHandle> {
        self.bindings.object(object_ref)
    }

    pub fn object_ref(&self, handle: ObjectHandle) -> Option<ObjectRef> {
        self.bindings.object_ref(handle)
    }

    pub fn channel(&self, entity: EntityId) -> Option<&ReplicationChannel> {
        self.channels.get(&entity)
    }

    pub fn channel_state(&self, entity: EntityId) -> Option<ChannelState> {
        self.channels.get(&entity).map(|channel| channel.state())
    }

    pub fn has_authority(&self, entity: EntityId, domain: AuthorityDomain) -> bool {
        self.channels
            .get(&entity)
            .map(|channel| channel.has_authority(domain))
            .unwrap_or(false)
    }

    pub fn bindings(&self) -> &ObjectBindingTable {
        &self.bindings
    }

    pub fn resolver(&self) -> &ReferenceResolver {
        &self.resolver
    }

    pub fn pending_creation_count(&self) -> usize {
        self.pending_creations.len()
    }

    // Shared helpers

    /// Builds the change tracker for a type the first time it is seen
    pub(super) fn ensure_tracker(
        &mut self,
        type_handle: TypeHandle,
        schema: &dyn SchemaResolver,
    ) -> Result<(), BridgeError> {
        if self.trackers.contains_key(&type_handle) {
            return Ok(());
        }
        let Some(layout) = schema.field_layout(type_handle) else {
            return Err(BridgeError::UnknownType {
                type_handle: type_handle.0,
            });
        };
        self.trackers
            .insert(type_handle, ChangeTracker::new(type_handle, layout));
        Ok(())
    }

    pub(super) fn authoritative_channel(
        &mut self,
        entity: EntityId,
        operation: &'static str,
    ) -> Result<&mut ReplicationChannel, BridgeError> {
        let Some(channel) = self.channels.get_mut(&entity) else {
            return Err(BridgeError::EntityNotBound {
                entity_id: entity.to_string(),
            });
        };
        if channel.is_closed() || !channel.has_authority(AuthorityDomain::Primary) {
            return Err(BridgeError::NotAuthoritative {
                entity_id: entity.to_string(),
                domain: AuthorityDomain::Primary.to_string(),
                operation,
            });
        }
        Ok(channel)
    }

    pub(super) fn type_of(&self, handle: ObjectHandle) -> Option<TypeHandle> {
        let object_ref = self.bindings.object_ref(handle)?;
        let channel = self.channels.get(&object_ref.entity)?;
        channel
            .replicator(object_ref.offset)
            .map(|replicator| replicator.type_handle())
    }

    /// Forgets queued, in-flight and held RPC bookkeeping for the entity
    pub(super) fn drop_rpc_state(&mut self, entity: EntityId) {
        let count = self.rpc_queue.drop_entity(entity);
        self.rpc_sender.remove_entity(entity);
        self.rpc_receiver.remove_entity(entity);
        self.rpc_dirty.remove(&entity);
        self.resolver.forget_blocked_rpcs(entity);
        if count > 0 {
            self.events.push(BridgeEvent::RpcsDiscarded { entity, count });
        }
    }
}
