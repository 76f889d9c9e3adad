use log::{debug, error, info, warn};

use crate::{
    bridge::{
        context::BridgeContext,
        error::BridgeError,
        events::{BridgeEvent, DropReason},
        replication_bridge::ReplicationBridge,
    },
    constants::DORMANT_COMPONENT_ID,
    invariant::report_violation,
    rpc::rpc_category::RpcPayload,
    view::wire::{CommandRequest, CommandResponse},
    world::{
        channel::replication_channel::{ObjectDelta, RemovedSubobject},
        component::{changelist::Changelist, component_data::ComponentData},
        reference::reference_resolver::outgoing_value,
    },
    AuthorityDomain, EntityId, ObjectHandle, ObjectHost, ObjectOffset, ObjectRef, SchemaResolver,
    TypeHandle,
};

impl<P: RpcPayload> ReplicationBridge<P> {
    /// Runs a replicate pass for every channel allowed to send, in entity
    /// order
    pub(super) fn replicate_outgoing(&mut self, ctx: &mut BridgeContext<'_, P>) {
        self.process_pending_creations(ctx);

        let mut entities: Vec<EntityId> = self
            .channels
            .iter()
            .filter(|(_, channel)| channel.can_replicate())
            .map(|(entity, _)| *entity)
            .collect();
        entities.sort();

        for entity in entities {
            self.replicate_entity(entity, ctx);
        }
    }

    fn replicate_entity(&mut self, entity: EntityId, ctx: &mut BridgeContext<'_, P>) {
        let Some(channel) = self.channels.get_mut(&entity) else {
            return;
        };
        let send_creation = channel.is_self_created() && channel.root().is_creating();
        let output = match channel.replicate(&self.trackers, &*ctx.host) {
            Ok(output) => output,
            Err(error) => {
                report_violation("replicating entity", &error);
                self.events.push(BridgeEvent::ProtocolViolation { entity, error });
                return;
            }
        };

        for removed in output.removed_subobjects.iter() {
            self.on_local_subobject_destroyed(entity, removed, ctx);
        }

        if send_creation {
            self.send_entity_creation(entity, ctx);
            self.rpc_dirty.insert(entity);
        } else {
            for delta in output.deltas.iter() {
                self.send_object_delta(entity, delta, ctx);
            }
        }

        let threshold = self.config.dormancy_threshold;
        let Some(channel) = self.channels.get_mut(&entity) else {
            return;
        };
        if channel.should_go_dormant(threshold) {
            match channel.enter_dormancy() {
                Ok(()) => {
                    ctx.wire
                        .send_component_add(entity, ComponentData::new(DORMANT_COMPONENT_ID));
                    info!("entity {} went dormant", entity);
                    self.events.push(BridgeEvent::WentDormant { entity });
                }
                Err(error) => report_violation("entering dormancy", &error),
            }
        }
    }

    fn send_object_delta(&mut self, entity: EntityId, delta: &ObjectDelta, ctx: &mut BridgeContext<'_, P>) {
        let limit = self.config.max_fields_per_message;
        if delta.changelist.len() > limit {
            error!(
                "dropping update of entity {} offset {}: {} fields exceed the limit of {}",
                entity,
                delta.offset,
                delta.changelist.len(),
                limit
            );
            self.events.push(BridgeEvent::UpdateDropped {
                entity,
                offset: delta.offset,
                reason: DropReason::OversizedChangelist {
                    fields: delta.changelist.len(),
                    limit,
                },
            });
            return;
        }

        let payloads = self.component_payloads(
            delta.handle,
            delta.type_handle,
            delta.offset,
            &delta.changelist,
            delta.creating,
            ctx.schema,
            &*ctx.host,
        );
        for data in payloads {
            if delta.creating {
                ctx.wire.send_component_add(entity, data);
            } else {
                ctx.wire.send_component_update(entity, data);
            }
        }
    }

    /// Groups the changed fields of an object by the component that carries
    /// them. Object references are sent in their wire form.
    #[allow(clippy::too_many_arguments)]
    fn component_payloads(
        &self,
        handle: ObjectHandle,
        type_handle: TypeHandle,
        offset: ObjectOffset,
        changelist: &Changelist,
        creating: bool,
        schema: &dyn SchemaResolver,
        host: &dyn ObjectHost,
    ) -> Vec<ComponentData> {
        let Some(values) = host.fields(handle) else {
            return Vec::new();
        };

        let mut payloads = Vec::new();
        for component in schema.components_for(type_handle, offset) {
            let mut data = ComponentData::new(component.id);
            for field in component.fields.iter() {
                if !changelist.contains(*field) {
                    continue;
                }
                let Some(value) = values.get(field.index()) else {
                    continue;
                };
                data.fields.push((*field, outgoing_value(&self.bindings, value)));
            }
            if data.is_empty() && !creating {
                continue;
            }
            payloads.push(data);
        }
        payloads
    }

    /// Requests creation of a self-created entity with the full state of
    /// its root and every attached sub-object
    fn send_entity_creation(&mut self, entity: EntityId, ctx: &mut BridgeContext<'_, P>) {
        let Some(channel) = self.channels.get(&entity) else {
            return;
        };

        let mut components = Vec::new();
        match ctx.schema.type_metadata(channel.root().type_handle()) {
            Some(metadata) => components.push(metadata.to_component()),
            None => warn!("entity {} has no metadata to create with", entity),
        }

        let offsets = std::iter::once(ObjectOffset::ROOT).chain(channel.subobject_offsets());
        for offset in offsets {
            let Some(replicator) = channel.replicator(offset) else {
                continue;
            };
            let Some(tracker) = self.trackers.get(&replicator.type_handle()) else {
                continue;
            };
            components.extend(self.component_payloads(
                replicator.handle(),
                replicator.type_handle(),
                offset,
                &tracker.full_changelist(),
                true,
                ctx.schema,
                &*ctx.host,
            ));
        }

        info!(
            "requesting creation of entity {} with {} components",
            entity,
            components.len()
        );
        ctx.wire
            .send_command_request(CommandRequest::CreateEntity { entity, components });
    }

    /// A sub-object of an authoritative entity was destroyed locally
    fn on_local_subobject_destroyed(
        &mut self,
        entity: EntityId,
        removed: &RemovedSubobject,
        ctx: &mut BridgeContext<'_, P>,
    ) {
        for component in ctx.schema.components_for(removed.type_handle, removed.offset) {
            ctx.wire.send_component_remove(entity, component.id);
        }
        let object_ref = ObjectRef::new(entity, removed.offset);
        self.bindings.unbind(object_ref);
        self.resolver.on_reference_mapped_to_unmapped(object_ref);
        self.resolver.remove_object(removed.handle);
        debug!("sub-object {} destroyed locally", object_ref);
    }

    // Local creation

    pub(super) fn begin_local_creation(
        &mut self,
        entity: EntityId,
        type_handle: TypeHandle,
        handle: ObjectHandle,
        ctx: &mut BridgeContext<'_, P>,
    ) -> Result<(), BridgeError> {
        self.ensure_tracker(type_handle, ctx.schema)?;
        self.bind_root(entity, handle, type_handle, true, true)?;
        if let Some(channel) = self.channels.get_mut(&entity) {
            channel.set_authority(AuthorityDomain::Primary, true);
        }
        self.rpc_sender
            .on_authority_gained(entity, AuthorityDomain::Primary, ctx.view);
        self.rpc_receiver
            .on_authority_gained(entity, AuthorityDomain::Primary, ctx.view);

        info!("assigned entity {} to local {}", entity, handle);
        self.events
            .push(BridgeEvent::LocalEntityAssigned { entity, handle });
        Ok(())
    }

    /// Binds waiting local objects to reserved ids, oldest first
    pub(super) fn process_pending_creations(&mut self, ctx: &mut BridgeContext<'_, P>) {
        while let Some((type_handle, handle)) = self.pending_creations.front().copied() {
            if !ctx.host.is_alive(handle) {
                debug!("{} was destroyed before it got an entity id", handle);
                self.pending_creations.pop_front();
                continue;
            }
            let Some(entity) = self.entity_ids.take() else {
                break;
            };
            self.pending_creations.pop_front();
            if let Err(error) = self.begin_local_creation(entity, type_handle, handle, ctx) {
                warn!("cannot create entity {} for {}: {}", entity, handle, error);
            }
        }
        self.request_entity_ids_if_needed(ctx);
    }

    pub(super) fn request_entity_ids_if_needed(&mut self, ctx: &mut BridgeContext<'_, P>) {
        if !self.entity_ids_in_use || !self.entity_ids.needs_refill() {
            return;
        }
        let count = self.entity_ids.batch_size();
        debug!("reserving {} entity ids", count);
        ctx.wire
            .send_command_request(CommandRequest::ReserveEntityIds { count });
        self.entity_ids.mark_requested();
    }

    /// Handles the store's answer to a command this bridge sent
    pub fn on_command_response(&mut self, response: CommandResponse, ctx: &mut BridgeContext<'_, P>) {
        match response {
            CommandResponse::EntityIdsReserved { first, count } => {
                debug!("reserved {} entity ids from {}", count, first);
                self.entity_ids.on_reserved(first, count);
                self.process_pending_creations(ctx);
            }
            CommandResponse::EntityIdReservationFailed => {
                warn!("entity id reservation failed");
                self.entity_ids.on_reservation_failed();
                self.request_entity_ids_if_needed(ctx);
            }
            CommandResponse::EntityCreated { entity, success } => {
                if success {
                    debug!("entity {} created", entity);
                    return;
                }
                warn!("creation of entity {} failed, retrying", entity);
                if let Some(channel) = self.channels.get_mut(&entity) {
                    if !channel.is_closed() {
                        channel.rearm_creation();
                    }
                }
                self.events
                    .push(BridgeEvent::EntityCreationFailed { entity });
            }
            CommandResponse::EntityDeleted { entity, success } => {
                if success {
                    debug!("entity {} deleted", entity);
                } else {
                    warn!("deletion of entity {} failed", entity);
                }
            }
        }
    }
}
