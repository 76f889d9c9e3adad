use crate::{
    world::{
        channel::{changelist_history::ChangelistHistory, error::ChannelError},
        component::{change_tracker::ChangeTracker, changelist::Changelist, shadow_state::ShadowState},
    },
    EntityId, FieldValue, ObjectHandle, ObjectOffset, TypeHandle,
};

/// Outgoing delta state of one object (the root or a sub-object) of a
/// replicated entity.
pub struct ObjectReplicator {
    handle: ObjectHandle,
    offset: ObjectOffset,
    type_handle: TypeHandle,
    shadow: ShadowState,
    history: ChangelistHistory,
    creating: bool,
}

impl ObjectReplicator {
    /// A replicator whose first pass sends a full snapshot
    pub fn new_creating(
        handle: ObjectHandle,
        offset: ObjectOffset,
        tracker: &ChangeTracker,
        history_capacity: usize,
    ) -> Self {
        Self {
            handle,
            offset,
            type_handle: tracker.type_handle(),
            shadow: ShadowState::from_layout(tracker.layout()),
            history: ChangelistHistory::new(history_capacity),
            creating: true,
        }
    }

    /// A replicator for an object that already exists remotely
    pub fn new_existing(
        handle: ObjectHandle,
        offset: ObjectOffset,
        tracker: &ChangeTracker,
        history_capacity: usize,
    ) -> Self {
        let mut replicator = Self::new_creating(handle, offset, tracker, history_capacity);
        replicator.creating = false;
        replicator
    }

    pub fn handle(&self) -> ObjectHandle {
        self.handle
    }

    pub fn offset(&self) -> ObjectOffset {
        self.offset
    }

    pub fn type_handle(&self) -> TypeHandle {
        self.type_handle
    }

    pub fn is_creating(&self) -> bool {
        self.creating
    }

    pub fn set_creating(&mut self) {
        self.creating = true;
    }

    pub fn shadow(&self) -> &ShadowState {
        &self.shadow
    }

    pub fn history(&self) -> &ChangelistHistory {
        &self.history
    }

    /// The current values become the baseline, so fields that drifted while
    /// another worker was authoritative aren't re-sent.
    pub fn refresh_shadow(&mut self, current: &[FieldValue]) {
        self.shadow.refresh(current);
    }

    pub fn reset_history(&mut self) {
        self.history.reset();
    }

    /// Runs one delta pass against the object's current values.
    ///
    /// While creating, the result is the entire field set and no history
    /// bookkeeping happens. Otherwise the changed fields enter the history
    /// ring and everything not yet sent is merged into the result.
    pub fn compute_outgoing_delta(
        &mut self,
        entity: EntityId,
        tracker: &ChangeTracker,
        current: &[FieldValue],
    ) -> Result<Changelist, ChannelError> {
        let component_error = |source| ChannelError::Component {
            entity_id: entity.to_string(),
            offset: self.offset.value(),
            source,
        };

        if self.creating {
            tracker
                .compare_and_update(&mut self.shadow, current)
                .map_err(component_error)?;
            self.creating = false;
            return Ok(tracker.full_changelist());
        }

        self.history.update_changelist_history(entity)?;
        let changed = tracker
            .compare_and_update(&mut self.shadow, current)
            .map_err(component_error)?;
        self.history.push(entity, changed)?;
        self.history.collect_unsent(entity, tracker)
    }
}
