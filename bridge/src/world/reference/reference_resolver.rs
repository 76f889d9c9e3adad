use std::collections::{hash_map::Entry, HashMap, HashSet};

use log::{trace, warn};

use crate::{
    world::binding::object_binding_table::ObjectBindingTable, EntityId, FieldHandle, FieldPath,
    FieldValue, ObjectHandle, ObjectHost, ObjectRef,
};

#[derive(Default)]
struct ObjectReferences {
    unresolved: HashMap<ObjectRef, HashSet<FieldPath>>,
    mapped: HashMap<ObjectRef, HashSet<FieldPath>>,
}

impl ObjectReferences {
    fn holds(&self, object_ref: &ObjectRef) -> bool {
        self.unresolved.contains_key(object_ref) || self.mapped.contains_key(object_ref)
    }

    fn is_empty(&self) -> bool {
        self.unresolved.is_empty() && self.mapped.is_empty()
    }

    fn refs(&self) -> HashSet<ObjectRef> {
        self.unresolved
            .keys()
            .chain(self.mapped.keys())
            .copied()
            .collect()
    }
}

/// Fields of one object that were rewritten when a reference resolved
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedFields {
    pub object: ObjectHandle,
    pub fields: Vec<FieldHandle>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolutionOutcome {
    /// Rep-notify candidates, one entry per dependent that wasn't finalized
    pub notifications: Vec<ResolvedFields>,
    /// Entities whose RPC extraction was held on this reference
    pub unblocked_rpc_entities: Vec<EntityId>,
}

/// Tracks object references held by local objects, forward (object to refs
/// and the field paths holding them) and backward (ref to dependent objects).
///
/// An object appears in `dependents[ref]` exactly when it holds `ref` as
/// unresolved or mapped; empty entries are pruned.
#[derive(Default)]
pub struct ReferenceResolver {
    objects: HashMap<ObjectHandle, ObjectReferences>,
    dependents: HashMap<ObjectRef, HashSet<ObjectHandle>>,
    blocked_rpcs: HashMap<ObjectRef, HashSet<EntityId>>,
    finalized: HashSet<ObjectHandle>,
}

impl ReferenceResolver {
    pub fn new() -> Self {
        Self::default()
    }

    // Registration

    pub fn register_pending_reference(
        &mut self,
        object: ObjectHandle,
        object_ref: ObjectRef,
        path: FieldPath,
    ) {
        let references = self.objects.entry(object).or_default();
        remove_path(&mut references.mapped, &object_ref, &path);
        references
            .unresolved
            .entry(object_ref)
            .or_default()
            .insert(path);
        self.dependents.entry(object_ref).or_default().insert(object);
    }

    pub fn register_mapped_reference(
        &mut self,
        object: ObjectHandle,
        object_ref: ObjectRef,
        path: FieldPath,
    ) {
        let references = self.objects.entry(object).or_default();
        remove_path(&mut references.unresolved, &object_ref, &path);
        references.mapped.entry(object_ref).or_default().insert(path);
        self.dependents.entry(object_ref).or_default().insert(object);
    }

    /// Forgets every reference held under a top-level field, before the field
    /// is overwritten by new data.
    pub fn clear_field(&mut self, object: ObjectHandle, field: FieldHandle) {
        let Some(references) = self.objects.get_mut(&object) else {
            return;
        };
        let touched = references.refs();
        retain_outside_field(&mut references.unresolved, field);
        retain_outside_field(&mut references.mapped, field);

        let dropped: Vec<ObjectRef> = touched
            .into_iter()
            .filter(|object_ref| !references.holds(object_ref))
            .collect();
        if references.is_empty() {
            self.objects.remove(&object);
        }
        for object_ref in dropped {
            self.remove_dependent(&object_ref, object);
        }
    }

    /// Converts a wire value into its local form, registering every nested
    /// reference as mapped (target bound) or pending (target not bound yet).
    pub fn localize_value(
        &mut self,
        bindings: &ObjectBindingTable,
        object: ObjectHandle,
        path: FieldPath,
        value: &FieldValue,
    ) -> FieldValue {
        match value {
            FieldValue::Ref(None) | FieldValue::Object(None) => FieldValue::Object(None),
            FieldValue::Ref(Some(object_ref)) => match bindings.object(*object_ref) {
                Some(target) => {
                    self.register_mapped_reference(object, *object_ref, path);
                    FieldValue::Object(Some(target))
                }
                None => {
                    trace!("{} waits on unresolved reference {}", object, object_ref);
                    self.register_pending_reference(object, *object_ref, path);
                    FieldValue::Object(None)
                }
            },
            FieldValue::Array(items) => FieldValue::Array(
                items
                    .iter()
                    .enumerate()
                    .map(|(index, item)| {
                        self.localize_value(bindings, object, path.child(index as u16), item)
                    })
                    .collect(),
            ),
            FieldValue::Struct(items) => FieldValue::Struct(
                items
                    .iter()
                    .enumerate()
                    .map(|(index, item)| {
                        self.localize_value(bindings, object, path.child(index as u16), item)
                    })
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    // Target lifecycle

    /// The target left view: every dependent that had it mapped now holds it
    /// unresolved. No notification fires; the stale value is corrected when
    /// the target resolves again.
    pub fn on_reference_mapped_to_unmapped(&mut self, object_ref: ObjectRef) {
        let Some(dependents) = self.dependents.get(&object_ref) else {
            return;
        };
        for dependent in dependents.iter() {
            let Some(references) = self.objects.get_mut(dependent) else {
                continue;
            };
            if let Some(paths) = references.mapped.remove(&object_ref) {
                references
                    .unresolved
                    .entry(object_ref)
                    .or_default()
                    .extend(paths);
            }
        }
    }

    /// The target became locally resolvable as `resolved`. Writes it into
    /// every dependent field still waiting on it and reports which top-level
    /// fields changed. Resolving the same reference again is a no-op.
    pub fn on_reference_resolved(
        &mut self,
        object_ref: ObjectRef,
        resolved: ObjectHandle,
        host: &mut dyn ObjectHost,
    ) -> ResolutionOutcome {
        let mut outcome = ResolutionOutcome::default();

        if let Some(dependents) = self.dependents.get(&object_ref) {
            let mut dependents: Vec<ObjectHandle> = dependents.iter().copied().collect();
            dependents.sort();

            for dependent in dependents {
                let Some(references) = self.objects.get_mut(&dependent) else {
                    continue;
                };
                let Some(paths) = references.unresolved.remove(&object_ref) else {
                    continue;
                };

                let mut fields: Vec<FieldHandle> = Vec::new();
                if let Some(values) = host.fields_mut(dependent) {
                    for path in paths.iter() {
                        let Some(value) = values.get_mut(path.field().index()) else {
                            warn!("{} has no field {:?}", dependent, path.field());
                            continue;
                        };
                        if value.set_at_path(path.nested_indices(), FieldValue::Object(Some(resolved))) {
                            if !fields.contains(&path.field()) {
                                fields.push(path.field());
                            }
                        } else {
                            warn!("{} has no value at {:?}", dependent, path);
                        }
                    }
                }
                references
                    .mapped
                    .entry(object_ref)
                    .or_default()
                    .extend(paths);

                if fields.is_empty() || self.finalized.contains(&dependent) || !host.is_alive(dependent) {
                    continue;
                }
                fields.sort();
                outcome.notifications.push(ResolvedFields {
                    object: dependent,
                    fields,
                });
            }
        }

        if let Some(entities) = self.blocked_rpcs.remove(&object_ref) {
            let mut entities: Vec<EntityId> = entities.into_iter().collect();
            entities.sort();
            outcome.unblocked_rpc_entities = entities;
        }

        outcome
    }

    /// The target will never resolve again (its entity was retired): every
    /// dependent drops the reference entirely.
    pub fn on_reference_destroyed(&mut self, object_ref: ObjectRef) {
        self.blocked_rpcs.remove(&object_ref);
        let Some(dependents) = self.dependents.remove(&object_ref) else {
            return;
        };
        for dependent in dependents {
            let mut remove = false;
            if let Some(references) = self.objects.get_mut(&dependent) {
                references.unresolved.remove(&object_ref);
                references.mapped.remove(&object_ref);
                remove = references.is_empty();
            }
            if remove {
                self.objects.remove(&dependent);
            }
        }
    }

    /// Removes an object and every reference it holds, pruning backward
    /// entries which become empty.
    pub fn remove_object(&mut self, object: ObjectHandle) {
        self.finalized.remove(&object);
        let Some(references) = self.objects.remove(&object) else {
            return;
        };
        for object_ref in references.refs() {
            self.remove_dependent(&object_ref, object);
        }
    }

    /// Late resolutions for a finalized object still write the value but no
    /// longer produce notifications.
    pub fn mark_finalized(&mut self, object: ObjectHandle) {
        self.finalized.insert(object);
    }

    // RPC gating

    pub fn block_rpcs_on(&mut self, object_ref: ObjectRef, entity: EntityId) {
        self.blocked_rpcs.entry(object_ref).or_default().insert(entity);
    }

    pub fn forget_blocked_rpcs(&mut self, entity: EntityId) {
        self.blocked_rpcs.retain(|_, entities| {
            entities.remove(&entity);
            !entities.is_empty()
        });
    }

    pub fn is_rpc_blocked(&self, entity: EntityId) -> bool {
        self.blocked_rpcs
            .values()
            .any(|entities| entities.contains(&entity))
    }

    // Queries

    pub fn has_unresolved_in_field(&self, object: ObjectHandle, field: FieldHandle) -> bool {
        self.objects
            .get(&object)
            .map(|references| {
                references
                    .unresolved
                    .values()
                    .any(|paths| paths.iter().any(|path| path.field() == field))
            })
            .unwrap_or(false)
    }

    pub fn unresolved_refs(&self, object: ObjectHandle) -> HashSet<ObjectRef> {
        self.objects
            .get(&object)
            .map(|references| references.unresolved.keys().copied().collect())
            .unwrap_or_default()
    }

    pub fn mapped_refs(&self, object: ObjectHandle) -> HashSet<ObjectRef> {
        self.objects
            .get(&object)
            .map(|references| references.mapped.keys().copied().collect())
            .unwrap_or_default()
    }

    pub fn dependents_of(&self, object_ref: ObjectRef) -> HashSet<ObjectHandle> {
        self.dependents.get(&object_ref).cloned().unwrap_or_default()
    }

    pub fn tracked_object_count(&self) -> usize {
        self.objects.len()
    }

    /// Backward and forward maps agree and hold no empty entries
    pub fn is_consistent(&self) -> bool {
        for (object_ref, dependents) in self.dependents.iter() {
            if dependents.is_empty() {
                return false;
            }
            for dependent in dependents {
                match self.objects.get(dependent) {
                    Some(references) if references.holds(object_ref) => {}
                    _ => return false,
                }
            }
        }
        for (object, references) in self.objects.iter() {
            if references.is_empty() {
                return false;
            }
            if references.unresolved.values().any(|paths| paths.is_empty())
                || references.mapped.values().any(|paths| paths.is_empty())
            {
                return false;
            }
            for object_ref in references.refs() {
                let listed = self
                    .dependents
                    .get(&object_ref)
                    .map(|dependents| dependents.contains(object))
                    .unwrap_or(false);
                if !listed {
                    return false;
                }
            }
        }
        true
    }

    fn remove_dependent(&mut self, object_ref: &ObjectRef, object: ObjectHandle) {
        if let Entry::Occupied(mut entry) = self.dependents.entry(*object_ref) {
            entry.get_mut().remove(&object);
            if entry.get().is_empty() {
                entry.remove();
            }
        }
    }
}

/// Converts a local value into its wire form. Objects which aren't bound to
/// an entity go out as null references.
pub fn outgoing_value(bindings: &ObjectBindingTable, value: &FieldValue) -> FieldValue {
    match value {
        FieldValue::Object(handle) => {
            FieldValue::Ref(handle.and_then(|handle| bindings.object_ref(handle)))
        }
        FieldValue::Array(items) => FieldValue::Array(
            items
                .iter()
                .map(|item| outgoing_value(bindings, item))
                .collect(),
        ),
        FieldValue::Struct(items) => FieldValue::Struct(
            items
                .iter()
                .map(|item| outgoing_value(bindings, item))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn remove_path(
    paths_by_ref: &mut HashMap<ObjectRef, HashSet<FieldPath>>,
    object_ref: &ObjectRef,
    path: &FieldPath,
) {
    if let Entry::Occupied(mut entry) = paths_by_ref.entry(*object_ref) {
        entry.get_mut().remove(path);
        if entry.get().is_empty() {
            entry.remove();
        }
    }
}

fn retain_outside_field(paths_by_ref: &mut HashMap<ObjectRef, HashSet<FieldPath>>, field: FieldHandle) {
    paths_by_ref.retain(|_, paths| {
        paths.retain(|path| path.field() != field);
        !paths.is_empty()
    });
}
