use std::collections::{BTreeMap, HashSet};

use log::{debug, info, trace, warn};

use crate::{
    bridge::{
        context::BridgeContext,
        error::BridgeError,
        events::{BridgeEvent, DropReason},
        replication_bridge::ReplicationBridge,
    },
    constants::{
        is_well_known_component, DORMANT_COMPONENT_ID, METADATA_COMPONENT_ID,
        NET_OWNERSHIP_COMPONENT_ID, TOMBSTONE_COMPONENT_ID,
    },
    invariant::report_violation,
    rpc::rpc_category::RpcPayload,
    view::entity_view::ComponentChange,
    world::{
        binding::{object_binding_table::ObjectClaim, pending_subobject::PendingSubobject},
        channel::{
            error::ChannelError,
            object_replicator::ObjectReplicator,
            replication_channel::{CloseReason, ReplicationChannel},
        },
        component::component_data::{ComponentData, ReplicationCategory},
    },
    AuthorityDomain, ComponentId, CreationData, EntityId, FieldHandle, FieldPath, ObjectHandle,
    ObjectHost, ObjectOffset, ObjectRef, RepNotifyCondition, SchemaResolver, TypeHandle,
};

impl<P: RpcPayload> ReplicationBridge<P> {
    // Entity lifecycle

    pub(super) fn on_entity_added(&mut self, entity: EntityId, ctx: &mut BridgeContext<'_, P>) {
        let view = ctx.view;
        let schema = ctx.schema;

        for component in [
            METADATA_COMPONENT_ID,
            NET_OWNERSHIP_COMPONENT_ID,
            TOMBSTONE_COMPONENT_ID,
        ] {
            if let Some(data) = view.get_component(entity, component) {
                if let Err(error) = self.bindings.store_creation_component(entity, data) {
                    warn!("{}", error);
                }
            }
        }

        if self.bindings.is_entity_bound(entity) {
            debug!("entity {} is already bound", entity);
            self.rpc_receiver.track_multicast(entity, view);
            return;
        }

        let Some(metadata) = self
            .bindings
            .creation_data(entity)
            .and_then(|data| data.metadata.clone())
        else {
            warn!("entity {} has no metadata, leaving it unbound", entity);
            self.unresolved_entities.insert(entity);
            self.events.push(BridgeEvent::TypeUnresolved { entity });
            return;
        };

        let tombstoned = self
            .bindings
            .creation_data(entity)
            .map(|data| data.tombstoned)
            .unwrap_or(false);
        if tombstoned {
            if let Some(handle) = ctx.host.find_well_known(&metadata) {
                info!("entity {} is tombstoned, destroying well-known {}", entity, handle);
                ctx.host.destroy_object(handle);
            }
            self.bindings.clear_creation_data(entity);
            return;
        }

        let Some(type_handle) = schema.resolve_type(&metadata) else {
            warn!(
                "entity {} has class path {} which doesn't resolve to a local type",
                entity, metadata.class_path
            );
            self.unresolved_entities.insert(entity);
            self.events.push(BridgeEvent::TypeUnresolved { entity });
            return;
        };
        if let Err(error) = self.ensure_tracker(type_handle, schema) {
            warn!("cannot bind entity {}: {}", entity, error);
            self.unresolved_entities.insert(entity);
            self.events.push(BridgeEvent::TypeUnresolved { entity });
            return;
        }
        self.unresolved_entities.remove(&entity);

        let claimed = match self.bindings.take_claim(entity) {
            Some(claim) if ctx.host.is_alive(claim.handle) => Some(claim),
            _ => None,
        };
        let (handle, self_created) = match claimed {
            Some(claim) => (claim.handle, claim.self_created),
            None => {
                let found = ctx.host.find_well_known(&metadata);
                match found.or_else(|| ctx.host.spawn_object(type_handle, &metadata)) {
                    Some(handle) => (handle, false),
                    None => {
                        warn!("host refused to create an object for entity {}", entity);
                        self.unresolved_entities.insert(entity);
                        self.events.push(BridgeEvent::TypeUnresolved { entity });
                        return;
                    }
                }
            }
        };

        if let Err(error) = self.bind_root(entity, handle, type_handle, self_created, false) {
            report_violation("binding entity", &error);
            return;
        }

        self.apply_initial_state(entity, handle, type_handle, ctx);

        if let Some(channel) = self.channels.get_mut(&entity) {
            if let Err(error) = channel.activate() {
                report_violation("activating channel", &error);
                self.events.push(BridgeEvent::ProtocolViolation { entity, error });
            } else if view.has_component(entity, DORMANT_COMPONENT_ID) {
                // the authoritative worker put it to sleep before we saw it
                if let Err(error) = channel.enter_dormancy() {
                    debug!("ignoring dormancy marker: {}", error);
                }
            }
        }
        self.rpc_receiver.track_multicast(entity, view);

        info!("bound entity {} to {}", entity, handle);
        self.events.push(BridgeEvent::EntityBound { entity, handle });

        for (offset, object) in self.bindings.objects_of_entity(entity) {
            self.resolve_reference(ObjectRef::new(entity, offset), object, ctx.host);
        }
    }

    pub(super) fn on_entity_removed(&mut self, entity: EntityId, ctx: &mut BridgeContext<'_, P>) {
        self.drop_rpc_state(entity);
        self.unresolved_entities.remove(&entity);

        if let Some(claim) = self.bindings.take_claim(entity) {
            // left relevancy earlier and now it's gone for good
            self.resolver.remove_object(claim.handle);
            ctx.host.destroy_object(claim.handle);
        }

        let Some(mut channel) = self.channels.remove(&entity) else {
            self.bindings.clear_creation_data(entity);
            debug!("removed entity {} was never bound", entity);
            return;
        };

        let reason = if channel.is_torn_off() {
            CloseReason::TornOff
        } else if channel.is_dormant() {
            CloseReason::Dormancy
        } else {
            CloseReason::Destroyed
        };
        let retained = reason != CloseReason::Destroyed;
        if !channel.is_closed() {
            channel.close(reason);
        }

        let objects = self.unbind_entity_objects(entity);
        if !retained {
            for (_, handle) in objects {
                ctx.host.destroy_object(handle);
            }
        }

        info!("entity {} removed, objects retained: {}", entity, retained);
        self.events.push(BridgeEvent::EntityUnbound { entity, retained });
    }

    /// The entity left this worker's view but still exists. Sub-objects are
    /// destroyed and the root object is kept as a claim for when it comes
    /// back.
    pub(super) fn on_entity_temporarily_removed(
        &mut self,
        entity: EntityId,
        ctx: &mut BridgeContext<'_, P>,
    ) {
        self.drop_rpc_state(entity);
        let Some(mut channel) = self.channels.remove(&entity) else {
            return;
        };
        let self_created = channel.is_self_created();
        let torn_off = channel.is_torn_off();
        if !channel.is_closed() {
            channel.close(CloseReason::Relevancy);
        }

        for (offset, handle) in self.unbind_entity_objects(entity) {
            if !offset.is_root() {
                ctx.host.destroy_object(handle);
            } else if !torn_off {
                self.bindings.claim(
                    entity,
                    ObjectClaim {
                        handle,
                        self_created,
                    },
                );
            }
        }

        info!("entity {} left relevancy", entity);
        self.events.push(BridgeEvent::EntityUnbound {
            entity,
            retained: true,
        });
    }

    /// Unbinds every object of the entity, sub-objects first. References to
    /// them flip back to unresolved in their dependents.
    fn unbind_entity_objects(&mut self, entity: EntityId) -> Vec<(ObjectOffset, ObjectHandle)> {
        let objects = self.bindings.unbind_entity(entity);
        for (offset, handle) in objects.iter() {
            self.resolver
                .on_reference_mapped_to_unmapped(ObjectRef::new(entity, *offset));
            self.resolver.remove_object(*handle);
        }
        objects
    }

    // Authority

    pub(super) fn on_authority_gained(
        &mut self,
        entity: EntityId,
        domain: AuthorityDomain,
        ctx: &mut BridgeContext<'_, P>,
    ) {
        self.rpc_sender.on_authority_gained(entity, domain, ctx.view);
        self.rpc_receiver.on_authority_gained(entity, domain, ctx.view);
        self.rpc_dirty.insert(entity);

        let Some(channel) = self.channels.get_mut(&entity) else {
            debug!("{} authority gained over unbound entity {}", domain, entity);
            return;
        };
        if channel.is_closed() {
            return;
        }
        channel.set_authority(domain, true);
        if domain == AuthorityDomain::Primary && !channel.is_creating() {
            // received values are the baseline, only later local writes go out.
            // A creation snapshot that hasn't gone out yet keeps its full state.
            channel.refresh_shadows(&*ctx.host);
        }
        let handle = channel.root_handle();
        ctx.host.authority_changed(handle, domain, true);

        info!("gained {} authority over entity {}", domain, entity);
        self.events.push(BridgeEvent::AuthorityChanged {
            entity,
            domain,
            authoritative: true,
        });
    }

    pub(super) fn on_authority_lost(
        &mut self,
        entity: EntityId,
        domain: AuthorityDomain,
        ctx: &mut BridgeContext<'_, P>,
    ) {
        self.rpc_sender.on_authority_lost(entity, domain);
        self.rpc_receiver.on_authority_lost(entity, domain);

        let Some(channel) = self.channels.get_mut(&entity) else {
            return;
        };
        if !channel.has_authority(domain) {
            return;
        }
        channel.set_authority(domain, false);
        let handle = channel.root_handle();
        if !channel.is_closed() {
            ctx.host.authority_changed(handle, domain, false);
        }

        info!("lost {} authority over entity {}", domain, entity);
        self.events.push(BridgeEvent::AuthorityChanged {
            entity,
            domain,
            authoritative: false,
        });
    }

    // Component changes

    pub(super) fn on_component_change(
        &mut self,
        entity: EntityId,
        change: &ComponentChange,
        ctx: &mut BridgeContext<'_, P>,
    ) {
        match change {
            ComponentChange::Added(data) | ComponentChange::Updated(data) => {
                self.on_component_data(entity, data, ctx)
            }
            ComponentChange::Removed(component) => {
                self.on_component_removed(entity, *component, ctx)
            }
        }
    }

    fn on_component_data(
        &mut self,
        entity: EntityId,
        data: &ComponentData,
        ctx: &mut BridgeContext<'_, P>,
    ) {
        if CreationData::is_creation_component(data.component) {
            if let Err(error) = self.bindings.store_creation_component(entity, data) {
                warn!("{}", error);
                return;
            }
            if data.component == METADATA_COMPONENT_ID && self.unresolved_entities.contains(&entity) {
                debug!("retrying bind of entity {} with new metadata", entity);
                self.on_entity_added(entity, ctx);
            }
            return;
        }
        if data.component == DORMANT_COMPONENT_ID {
            if let Some(channel) = self.channels.get_mut(&entity) {
                if !channel.has_authority(AuthorityDomain::Primary) && !channel.is_dormant() {
                    if let Err(error) = channel.enter_dormancy() {
                        debug!("ignoring dormancy marker: {}", error);
                    }
                }
            }
            return;
        }
        if is_well_known_component(data.component) {
            return;
        }

        let Some(info) = ctx.schema.component_info(data.component) else {
            warn!("component {} of entity {} is unknown", data.component, entity);
            return;
        };
        let Some(channel) = self.channels.get(&entity) else {
            warn!(
                "dropping component {} update for unbound entity {}",
                data.component, entity
            );
            self.events.push(BridgeEvent::UpdateDropped {
                entity,
                offset: info.offset,
                reason: DropReason::UnboundEntity,
            });
            return;
        };
        if channel.is_torn_off() {
            trace!("entity {} is torn off, ignoring component {}", entity, data.component);
            return;
        }
        if channel.has_authority(AuthorityDomain::Primary) {
            warn!(
                "entity {} is authoritative here, ignoring remote write to component {}",
                entity, data.component
            );
            self.events.push(BridgeEvent::UpdateDropped {
                entity,
                offset: info.offset,
                reason: DropReason::NotPermitted,
            });
            return;
        }

        if info.offset.is_root() {
            let handle = channel.root_handle();
            let type_handle = channel.root().type_handle();
            let notify =
                self.apply_component_batch(entity, info.offset, handle, type_handle, &[data], ctx.host);
            if !notify.is_empty() {
                ctx.host.rep_notify(handle, &notify);
            }
        } else {
            self.accept_subobject_component(entity, info.offset, info.type_handle, data.clone(), ctx);
        }
    }

    fn on_component_removed(
        &mut self,
        entity: EntityId,
        component: ComponentId,
        ctx: &mut BridgeContext<'_, P>,
    ) {
        if component == DORMANT_COMPONENT_ID {
            if let Some(channel) = self.channels.get_mut(&entity) {
                if channel.is_dormant() && !channel.has_authority(AuthorityDomain::Primary) {
                    if let Err(error) = channel.activate() {
                        debug!("ignoring dormancy wake: {}", error);
                    }
                }
            }
            return;
        }
        if is_well_known_component(component) {
            return;
        }
        let Some(info) = ctx.schema.component_info(component) else {
            return;
        };
        if info.offset.is_root() {
            debug!("component {} of entity {} root removed", component, entity);
            return;
        }

        let object_ref = ObjectRef::new(entity, info.offset);
        if let Some(pending) = self.bindings.pending_subobject_mut(object_ref) {
            pending.forget(component);
            return;
        }
        let Some(handle) = self.bindings.object(object_ref) else {
            return;
        };
        if self.has_authority(entity, AuthorityDomain::Primary) {
            return;
        }

        self.bindings.unbind(object_ref);
        self.resolver.on_reference_mapped_to_unmapped(object_ref);
        self.resolver.remove_object(handle);
        if let Some(channel) = self.channels.get_mut(&entity) {
            channel.remove_subobject(info.offset);
        }
        ctx.host.destroy_object(handle);
        debug!("sub-object {} of entity {} removed remotely", object_ref, entity);
    }

    // Binding

    pub(super) fn bind_root(
        &mut self,
        entity: EntityId,
        handle: ObjectHandle,
        type_handle: TypeHandle,
        self_created: bool,
        creating: bool,
    ) -> Result<(), BridgeError> {
        if self.channels.contains_key(&entity) {
            return Err(ChannelError::DuplicateObject {
                entity_id: entity.to_string(),
                offset: ObjectOffset::ROOT.value(),
            }
            .into());
        }
        let Some(tracker) = self.trackers.get(&type_handle) else {
            return Err(BridgeError::UnknownType {
                type_handle: type_handle.0,
            });
        };
        self.bindings.try_bind(ObjectRef::root(entity), handle)?;

        let capacity = self.config.history_capacity;
        let root = if creating {
            ObjectReplicator::new_creating(handle, ObjectOffset::ROOT, tracker, capacity)
        } else {
            ObjectReplicator::new_existing(handle, ObjectOffset::ROOT, tracker, capacity)
        };
        let mut channel = ReplicationChannel::new(entity, root, self_created);
        channel.begin_first_replication()?;
        self.channels.insert(entity, channel);
        Ok(())
    }

    pub(super) fn bind_subobject(
        &mut self,
        entity: EntityId,
        offset: ObjectOffset,
        handle: ObjectHandle,
        type_handle: TypeHandle,
        creating: bool,
    ) -> Result<(), BridgeError> {
        let Some(channel) = self.channels.get_mut(&entity) else {
            return Err(BridgeError::EntityNotBound {
                entity_id: entity.to_string(),
            });
        };
        let Some(tracker) = self.trackers.get(&type_handle) else {
            return Err(BridgeError::UnknownType {
                type_handle: type_handle.0,
            });
        };
        if channel.has_object(offset) {
            return Err(ChannelError::DuplicateObject {
                entity_id: entity.to_string(),
                offset: offset.value(),
            }
            .into());
        }
        self.bindings.try_bind(ObjectRef::new(entity, offset), handle)?;

        let capacity = self.config.history_capacity;
        let replicator = if creating {
            ObjectReplicator::new_creating(handle, offset, tracker, capacity)
        } else {
            ObjectReplicator::new_existing(handle, offset, tracker, capacity)
        };
        channel.add_subobject(replicator)?;
        Ok(())
    }

    // Applying received state

    /// Applies the entity's full current state after its root was bound:
    /// the root's components as one batch, then every sub-object.
    fn apply_initial_state(
        &mut self,
        entity: EntityId,
        root: ObjectHandle,
        type_handle: TypeHandle,
        ctx: &mut BridgeContext<'_, P>,
    ) {
        let view = ctx.view;
        let schema = ctx.schema;

        let mut root_batch: Vec<&ComponentData> = Vec::new();
        let mut subobjects: BTreeMap<ObjectOffset, (TypeHandle, Vec<&ComponentData>)> =
            BTreeMap::new();
        let mut components = view.component_ids(entity);
        components.sort();
        for component in components {
            if is_well_known_component(component) {
                continue;
            }
            let Some(data) = view.get_component(entity, component) else {
                continue;
            };
            let Some(info) = schema.component_info(component) else {
                warn!("component {} of entity {} is unknown", component, entity);
                continue;
            };
            if info.offset.is_root() {
                root_batch.push(data);
            } else {
                subobjects
                    .entry(info.offset)
                    .or_insert_with(|| (info.type_handle, Vec::new()))
                    .1
                    .push(data);
            }
        }

        let notify = self.apply_component_batch(
            entity,
            ObjectOffset::ROOT,
            root,
            type_handle,
            &root_batch,
            ctx.host,
        );
        for (offset, (sub_type, batch)) in subobjects {
            for data in batch {
                self.accept_subobject_component(entity, offset, sub_type, data.clone(), ctx);
            }
        }
        if !notify.is_empty() {
            ctx.host.rep_notify(root, &notify);
        }
    }

    /// Writes a batch of received components into the object and returns
    /// the fields whose rep-notify should fire. Notification is deferred
    /// until the whole batch is applied; a field still holding an unresolved
    /// reference doesn't notify unless it is an array.
    pub(super) fn apply_component_batch(
        &mut self,
        entity: EntityId,
        offset: ObjectOffset,
        handle: ObjectHandle,
        type_handle: TypeHandle,
        batch: &[&ComponentData],
        host: &mut dyn ObjectHost,
    ) -> Vec<FieldHandle> {
        let Some(tracker) = self.trackers.get(&type_handle) else {
            warn!("no change tracker for type {:?}", type_handle);
            return Vec::new();
        };

        let mut notify: Vec<FieldHandle> = Vec::new();
        for data in batch {
            for (field, wire_value) in data.fields.iter() {
                if let Err(error) = tracker.check_value(*field, wire_value) {
                    warn!("dropping value for entity {}: {}", entity, error);
                    self.events.push(BridgeEvent::UpdateDropped {
                        entity,
                        offset,
                        reason: DropReason::SchemaMismatch,
                    });
                    continue;
                }
                self.resolver.clear_field(handle, *field);
                let local = self.resolver.localize_value(
                    &self.bindings,
                    handle,
                    FieldPath::top_level(*field),
                    wire_value,
                );

                let Some(values) = host.fields_mut(handle) else {
                    warn!("{} of entity {} is gone", handle, entity);
                    return Vec::new();
                };
                let Some(slot) = values.get_mut(field.index()) else {
                    continue;
                };
                let previous = std::mem::replace(slot, local);
                let condition = tracker
                    .layout()
                    .descriptor(*field)
                    .map(|descriptor| descriptor.rep_notify())
                    .unwrap_or(RepNotifyCondition::Never);
                let fire = match condition {
                    RepNotifyCondition::Never => false,
                    RepNotifyCondition::OnChanged => tracker.field_changed(*field, &previous, slot),
                    RepNotifyCondition::Always => true,
                };
                if fire && !notify.contains(field) {
                    notify.push(*field);
                }
            }
        }

        notify.retain(|field| {
            tracker.is_indexable(*field) || !self.resolver.has_unresolved_in_field(handle, *field)
        });
        notify
    }

    /// Routes a received sub-object component: applied directly when the
    /// sub-object is bound, otherwise buffered until the expected component
    /// set is complete and the sub-object can be created in one go.
    fn accept_subobject_component(
        &mut self,
        entity: EntityId,
        offset: ObjectOffset,
        type_handle: TypeHandle,
        data: ComponentData,
        ctx: &mut BridgeContext<'_, P>,
    ) {
        let object_ref = ObjectRef::new(entity, offset);
        if let Some(handle) = self.bindings.object(object_ref) {
            let notify =
                self.apply_component_batch(entity, offset, handle, type_handle, &[&data], ctx.host);
            if !notify.is_empty() {
                ctx.host.rep_notify(handle, &notify);
            }
            return;
        }

        if !self.bindings.has_pending_subobject(object_ref) {
            let expected = self.expected_components(entity, type_handle, offset, ctx.schema);
            self.bindings
                .insert_pending_subobject(object_ref, PendingSubobject::new(type_handle, expected));
        }
        let complete = match self.bindings.pending_subobject_mut(object_ref) {
            Some(pending) => {
                pending.accept(data);
                if !pending.is_complete() {
                    trace!("{} waits for components {:?}", object_ref, pending.missing());
                }
                pending.is_complete()
            }
            None => false,
        };
        if complete {
            self.instantiate_subobject(entity, offset, ctx);
        }
    }

    /// Components of a sub-object type this worker should expect to see,
    /// given its ownership of and authority over the entity
    fn expected_components(
        &self,
        entity: EntityId,
        type_handle: TypeHandle,
        offset: ObjectOffset,
        schema: &dyn SchemaResolver,
    ) -> HashSet<ComponentId> {
        let owner = self
            .bindings
            .creation_data(entity)
            .map(|data| data.is_owned_by(&self.config.worker_id))
            .unwrap_or(false);
        let authoritative = self.has_authority(entity, AuthorityDomain::Primary);

        schema
            .components_for(type_handle, offset)
            .into_iter()
            .filter(|component| match component.category {
                ReplicationCategory::AlwaysVisible | ReplicationCategory::FirstFrameOnly => true,
                ReplicationCategory::OwnerOnly => owner,
                ReplicationCategory::AuthorityOnly => authoritative,
            })
            .map(|component| component.id)
            .collect()
    }

    fn instantiate_subobject(
        &mut self,
        entity: EntityId,
        offset: ObjectOffset,
        ctx: &mut BridgeContext<'_, P>,
    ) {
        let object_ref = ObjectRef::new(entity, offset);
        let Some(pending) = self.bindings.take_pending_subobject(object_ref) else {
            return;
        };
        let type_handle = pending.type_handle();
        let Some(root) = self.bindings.root_object(entity) else {
            warn!("sub-object {} has no root object", object_ref);
            return;
        };
        if let Err(error) = self.ensure_tracker(type_handle, ctx.schema) {
            warn!("cannot create sub-object {}: {}", object_ref, error);
            return;
        }
        let Some(handle) = ctx.host.spawn_subobject(root, type_handle) else {
            warn!("host refused to create sub-object {}", object_ref);
            return;
        };
        if let Err(error) = self.bind_subobject(entity, offset, handle, type_handle, false) {
            report_violation("binding sub-object", &error);
            ctx.host.destroy_object(handle);
            return;
        }

        let components = pending.into_components();
        let batch: Vec<&ComponentData> = components.iter().collect();
        let notify = self.apply_component_batch(entity, offset, handle, type_handle, &batch, ctx.host);
        if !notify.is_empty() {
            ctx.host.rep_notify(handle, &notify);
        }

        debug!("attached sub-object {} as {}", object_ref, handle);
        self.events.push(BridgeEvent::SubobjectAttached {
            entity,
            offset,
            handle,
        });
        self.resolve_reference(object_ref, handle, ctx.host);
    }

    // References

    /// `object_ref` just became resolvable as `handle`: patches every
    /// dependent and fires the rep-notifies that are no longer held back
    pub(super) fn resolve_reference(
        &mut self,
        object_ref: ObjectRef,
        handle: ObjectHandle,
        host: &mut dyn ObjectHost,
    ) {
        let outcome = self.resolver.on_reference_resolved(object_ref, handle, host);
        for resolved in outcome.notifications {
            let Some(type_handle) = self.type_of(resolved.object) else {
                continue;
            };
            let Some(tracker) = self.trackers.get(&type_handle) else {
                continue;
            };
            let fields: Vec<FieldHandle> = resolved
                .fields
                .into_iter()
                .filter(|field| {
                    let condition = tracker
                        .layout()
                        .descriptor(*field)
                        .map(|descriptor| descriptor.rep_notify())
                        .unwrap_or(RepNotifyCondition::Never);
                    condition != RepNotifyCondition::Never
                        && (tracker.is_indexable(*field)
                            || !self.resolver.has_unresolved_in_field(resolved.object, *field))
                })
                .collect();
            if !fields.is_empty() {
                host.rep_notify(resolved.object, &fields);
            }
        }
        for entity in outcome.unblocked_rpc_entities {
            trace!("RPCs of entity {} no longer wait on {}", entity, object_ref);
        }
    }
}
