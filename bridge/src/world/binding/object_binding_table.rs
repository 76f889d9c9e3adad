use std::collections::{BTreeMap, HashMap};

use crate::{
    world::binding::{
        checked_map::CheckedMap, creation_data::CreationData, error::BindingError,
        pending_subobject::PendingSubobject,
    },
    ComponentData, EntityId, ObjectHandle, ObjectOffset, ObjectRef,
};

/// A local object waiting for its entity's next ADD, either because this
/// worker created the entity or because the entity briefly left view.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ObjectClaim {
    pub handle: ObjectHandle,
    pub self_created: bool,
}

/// Bidirectional map between (entity, offset) pairs and local objects.
///
/// Exclusively owns the entity/object mapping: every bound object maps back
/// to exactly one (entity, offset), and no pair is bound twice.
pub struct ObjectBindingTable {
    object_by_ref: CheckedMap<ObjectRef, ObjectHandle>,
    ref_by_object: CheckedMap<ObjectHandle, ObjectRef>,
    offsets_by_entity: HashMap<EntityId, BTreeMap<ObjectOffset, ObjectHandle>>,
    creation_data: HashMap<EntityId, CreationData>,
    pending_subobjects: HashMap<ObjectRef, PendingSubobject>,
    claims: HashMap<EntityId, ObjectClaim>,
}

impl Default for ObjectBindingTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectBindingTable {
    pub fn new() -> Self {
        Self {
            object_by_ref: CheckedMap::new(),
            ref_by_object: CheckedMap::new(),
            offsets_by_entity: HashMap::new(),
            creation_data: HashMap::new(),
            pending_subobjects: HashMap::new(),
            claims: HashMap::new(),
        }
    }

    // Binding

    /// Binds a local object to an (entity, offset) pair. Both sides must be
    /// unbound.
    pub fn try_bind(&mut self, object_ref: ObjectRef, handle: ObjectHandle) -> Result<(), BindingError> {
        if self.object_by_ref.contains_key(&object_ref) {
            return Err(BindingError::AlreadyBound {
                object_ref: object_ref.to_string(),
            });
        }
        if let Some(existing) = self.ref_by_object.get(&handle) {
            return Err(BindingError::ObjectAlreadyBound {
                handle: handle.to_string(),
                object_ref: existing.to_string(),
            });
        }

        self.object_by_ref.try_insert(object_ref, handle)?;
        self.ref_by_object.try_insert(handle, object_ref)?;
        self.offsets_by_entity
            .entry(object_ref.entity)
            .or_default()
            .insert(object_ref.offset, handle);
        Ok(())
    }

    /// Binds a local object to an (entity, offset) pair
    ///
    /// # Panics
    ///
    /// Panics if either side is already bound.
    /// Consider using `try_bind` for error handling instead.
    pub fn bind(&mut self, object_ref: ObjectRef, handle: ObjectHandle) {
        self.try_bind(object_ref, handle)
            .expect("Cannot bind an object twice. Check whether it is bound first.")
    }

    pub fn unbind(&mut self, object_ref: ObjectRef) -> Option<ObjectHandle> {
        let handle = self.object_by_ref.remove(&object_ref)?;
        self.ref_by_object.remove(&handle);
        if let Some(offsets) = self.offsets_by_entity.get_mut(&object_ref.entity) {
            offsets.remove(&object_ref.offset);
            if offsets.is_empty() {
                self.offsets_by_entity.remove(&object_ref.entity);
            }
        }
        Some(handle)
    }

    /// Unbinds every object of the entity, sub-objects first, and forgets its
    /// pending sub-objects and creation data.
    pub fn unbind_entity(&mut self, entity: EntityId) -> Vec<(ObjectOffset, ObjectHandle)> {
        self.pending_subobjects
            .retain(|object_ref, _| object_ref.entity != entity);
        self.creation_data.remove(&entity);

        let Some(offsets) = self.offsets_by_entity.remove(&entity) else {
            return Vec::new();
        };
        let mut unbound: Vec<(ObjectOffset, ObjectHandle)> = offsets.into_iter().collect();
        unbound.reverse();
        for (offset, handle) in unbound.iter() {
            self.object_by_ref.remove(&ObjectRef::new(entity, *offset));
            self.ref_by_object.remove(handle);
        }
        unbound
    }

    pub fn object(&self, object_ref: ObjectRef) -> Option<ObjectHandle> {
        self.object_by_ref.get(&object_ref).copied()
    }

    pub fn object_ref(&self, handle: ObjectHandle) -> Option<ObjectRef> {
        self.ref_by_object.get(&handle).copied()
    }

    pub fn root_object(&self, entity: EntityId) -> Option<ObjectHandle> {
        self.object(ObjectRef::root(entity))
    }

    pub fn is_entity_bound(&self, entity: EntityId) -> bool {
        self.object_by_ref.contains_key(&ObjectRef::root(entity))
    }

    pub fn objects_of_entity(&self, entity: EntityId) -> Vec<(ObjectOffset, ObjectHandle)> {
        self.offsets_by_entity
            .get(&entity)
            .map(|offsets| offsets.iter().map(|(offset, handle)| (*offset, *handle)).collect())
            .unwrap_or_default()
    }

    pub fn bound_entities(&self) -> Vec<EntityId> {
        let mut entities: Vec<EntityId> = self.offsets_by_entity.keys().copied().collect();
        entities.sort();
        entities
    }

    pub fn len(&self) -> usize {
        self.object_by_ref.len()
    }

    pub fn is_empty(&self) -> bool {
        self.object_by_ref.is_empty()
    }

    /// Every bound object maps back to exactly the pair it's bound to
    pub fn is_bijective(&self) -> bool {
        if self.object_by_ref.len() != self.ref_by_object.len() {
            return false;
        }
        self.object_by_ref.iter().all(|(object_ref, handle)| {
            self.ref_by_object.get(handle) == Some(object_ref)
                && self
                    .offsets_by_entity
                    .get(&object_ref.entity)
                    .and_then(|offsets| offsets.get(&object_ref.offset))
                    == Some(handle)
        })
    }

    // Creation data

    pub fn store_creation_component(
        &mut self,
        entity: EntityId,
        data: &ComponentData,
    ) -> Result<(), BindingError> {
        if !CreationData::is_creation_component(data.component) {
            return Ok(());
        }
        self.creation_data.entry(entity).or_default().store(entity, data)
    }

    pub fn creation_data(&self, entity: EntityId) -> Option<&CreationData> {
        self.creation_data.get(&entity)
    }

    pub fn clear_creation_data(&mut self, entity: EntityId) {
        self.creation_data.remove(&entity);
    }

    // Claims

    pub fn claim(&mut self, entity: EntityId, claim: ObjectClaim) {
        self.claims.insert(entity, claim);
    }

    pub fn take_claim(&mut self, entity: EntityId) -> Option<ObjectClaim> {
        self.claims.remove(&entity)
    }

    pub fn has_claim(&self, entity: EntityId) -> bool {
        self.claims.contains_key(&entity)
    }

    // Pending sub-objects

    pub fn pending_subobject_mut(&mut self, object_ref: ObjectRef) -> Option<&mut PendingSubobject> {
        self.pending_subobjects.get_mut(&object_ref)
    }

    pub fn insert_pending_subobject(&mut self, object_ref: ObjectRef, pending: PendingSubobject) {
        self.pending_subobjects.insert(object_ref, pending);
    }

    pub fn take_pending_subobject(&mut self, object_ref: ObjectRef) -> Option<PendingSubobject> {
        self.pending_subobjects.remove(&object_ref)
    }

    pub fn has_pending_subobject(&self, object_ref: ObjectRef) -> bool {
        self.pending_subobjects.contains_key(&object_ref)
    }
}
