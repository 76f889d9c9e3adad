//! ## `ReplicationChannel` – Per‑Entity Delta Engine
//!
//! Owns the outgoing replication state of one locally relevant entity: an
//! [`ObjectReplicator`] for the root object plus one for every live
//! sub‑object, the cached authority flags, and the dormancy counter.
//!
//! ### State machine
//!
//! ```text
//!   Created ──bind──▶ AwaitingFirstReplication ──first pass──▶ Active ◀──▶ Dormant
//!                                                                 │           │
//!                                     any state ──close──▶ Closed(Destroyed|Dormancy|TornOff|Relevancy)
//! ```
//!
//! * Self‑created entities stay in `AwaitingFirstReplication` until their
//!   creation snapshot goes out; received entities leave it once their
//!   initial component batch has been applied.
//! * Outgoing deltas are only computed while `Active`, with primary
//!   authority held and outbound replication enabled.
//! * A channel goes `Dormant` only after it requested dormancy and
//!   `dormancy_threshold` consecutive passes produced no changes.

use std::{
    collections::{BTreeMap, HashMap},
    fmt,
};

use log::debug;

use crate::{
    world::{
        channel::{error::ChannelError, object_replicator::ObjectReplicator},
        component::{change_tracker::ChangeTracker, changelist::Changelist},
    },
    AuthorityDomain, EntityId, ObjectHandle, ObjectHost, ObjectOffset, TypeHandle,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    Destroyed,
    Dormancy,
    TornOff,
    Relevancy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Created,
    AwaitingFirstReplication,
    Active,
    Dormant,
    Closed(CloseReason),
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Cached authority per domain
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuthorityFlags {
    primary: bool,
    secondary: bool,
}

impl AuthorityFlags {
    pub fn get(&self, domain: AuthorityDomain) -> bool {
        match domain {
            AuthorityDomain::Primary => self.primary,
            AuthorityDomain::Secondary => self.secondary,
        }
    }

    pub fn set(&mut self, domain: AuthorityDomain, authoritative: bool) {
        match domain {
            AuthorityDomain::Primary => self.primary = authoritative,
            AuthorityDomain::Secondary => self.secondary = authoritative,
        }
    }
}

/// A computed delta for one object of the entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectDelta {
    pub offset: ObjectOffset,
    pub handle: ObjectHandle,
    pub type_handle: TypeHandle,
    pub changelist: Changelist,
    /// The object doesn't exist remotely yet, so the changelist is a full
    /// snapshot to be sent as component adds
    pub creating: bool,
}

/// A sub-object whose handle went invalid since the previous pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemovedSubobject {
    pub offset: ObjectOffset,
    pub handle: ObjectHandle,
    pub type_handle: TypeHandle,
}

#[derive(Debug, Default)]
pub struct ReplicationOutput {
    pub deltas: Vec<ObjectDelta>,
    pub removed_subobjects: Vec<RemovedSubobject>,
}

pub struct ReplicationChannel {
    entity: EntityId,
    state: ChannelState,
    authority: AuthorityFlags,
    self_created: bool,
    outbound_active: bool,
    root: ObjectReplicator,
    subobjects: BTreeMap<ObjectOffset, ObjectReplicator>,
    empty_passes: u32,
    dormancy_requested: bool,
}

impl ReplicationChannel {
    pub fn new(entity: EntityId, root: ObjectReplicator, self_created: bool) -> Self {
        Self {
            entity,
            state: ChannelState::Created,
            authority: AuthorityFlags::default(),
            self_created,
            outbound_active: false,
            root,
            subobjects: BTreeMap::new(),
            empty_passes: 0,
            dormancy_requested: false,
        }
    }

    pub fn entity(&self) -> EntityId {
        self.entity
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    pub fn root(&self) -> &ObjectReplicator {
        &self.root
    }

    pub fn root_handle(&self) -> ObjectHandle {
        self.root.handle()
    }

    pub fn is_self_created(&self) -> bool {
        self.self_created
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, ChannelState::Closed(_))
    }

    pub fn is_dormant(&self) -> bool {
        self.state == ChannelState::Dormant
    }

    pub fn is_torn_off(&self) -> bool {
        self.state == ChannelState::Closed(CloseReason::TornOff)
    }

    pub fn is_creating(&self) -> bool {
        self.root.is_creating()
    }

    // State transitions

    fn invalid_transition(&self, operation: &'static str) -> ChannelError {
        ChannelError::InvalidTransition {
            entity_id: self.entity.to_string(),
            operation,
            state: self.state.to_string(),
        }
    }

    pub fn begin_first_replication(&mut self) -> Result<(), ChannelError> {
        if self.state != ChannelState::Created {
            return Err(self.invalid_transition("await first replication"));
        }
        self.state = ChannelState::AwaitingFirstReplication;
        Ok(())
    }

    pub fn activate(&mut self) -> Result<(), ChannelError> {
        match self.state {
            ChannelState::AwaitingFirstReplication | ChannelState::Dormant => {
                self.state = ChannelState::Active;
                self.empty_passes = 0;
                Ok(())
            }
            ChannelState::Active => Ok(()),
            _ => Err(self.invalid_transition("activate")),
        }
    }

    /// Detaches outgoing bookkeeping; the object itself is kept
    pub fn enter_dormancy(&mut self) -> Result<(), ChannelError> {
        if self.state != ChannelState::Active {
            return Err(self.invalid_transition("go dormant"));
        }
        self.state = ChannelState::Dormant;
        self.dormancy_requested = false;
        self.empty_passes = 0;
        self.root.reset_history();
        for replicator in self.subobjects.values_mut() {
            replicator.reset_history();
        }
        Ok(())
    }

    pub fn close(&mut self, reason: CloseReason) {
        debug!("closing channel of entity {}: {:?}", self.entity, reason);
        self.state = ChannelState::Closed(reason);
        self.outbound_active = false;
    }

    // Authority

    pub fn has_authority(&self, domain: AuthorityDomain) -> bool {
        self.authority.get(domain)
    }

    pub fn set_authority(&mut self, domain: AuthorityDomain, authoritative: bool) {
        self.authority.set(domain, authoritative);
        if domain == AuthorityDomain::Primary {
            self.outbound_active = authoritative;
        }
    }

    pub fn is_outbound_active(&self) -> bool {
        self.outbound_active
    }

    /// Whether a replicate pass may compute outgoing deltas now
    pub fn can_replicate(&self) -> bool {
        if !self.outbound_active || !self.authority.get(AuthorityDomain::Primary) {
            return false;
        }
        match self.state {
            ChannelState::Active => true,
            ChannelState::AwaitingFirstReplication => self.self_created,
            _ => false,
        }
    }

    // Dormancy

    pub fn request_dormancy(&mut self) {
        self.dormancy_requested = true;
    }

    pub fn is_dormancy_requested(&self) -> bool {
        self.dormancy_requested
    }

    pub fn empty_passes(&self) -> u32 {
        self.empty_passes
    }

    pub fn should_go_dormant(&self, threshold: u32) -> bool {
        self.dormancy_requested
            && self.state == ChannelState::Active
            && self.empty_passes >= threshold
    }

    // Objects

    pub fn add_subobject(&mut self, replicator: ObjectReplicator) -> Result<(), ChannelError> {
        let offset = replicator.offset();
        if offset.is_root() || self.subobjects.contains_key(&offset) {
            return Err(ChannelError::DuplicateObject {
                entity_id: self.entity.to_string(),
                offset: offset.value(),
            });
        }
        self.subobjects.insert(offset, replicator);
        Ok(())
    }

    pub fn remove_subobject(&mut self, offset: ObjectOffset) -> Option<ObjectReplicator> {
        self.subobjects.remove(&offset)
    }

    pub fn has_object(&self, offset: ObjectOffset) -> bool {
        offset.is_root() || self.subobjects.contains_key(&offset)
    }

    pub fn subobject_offsets(&self) -> Vec<ObjectOffset> {
        self.subobjects.keys().copied().collect()
    }

    pub fn replicator(&self, offset: ObjectOffset) -> Option<&ObjectReplicator> {
        if offset.is_root() {
            Some(&self.root)
        } else {
            self.subobjects.get(&offset)
        }
    }

    /// Re-arms the creation snapshot, for a creation the store rejected
    pub fn rearm_creation(&mut self) {
        self.root.set_creating();
        for replicator in self.subobjects.values_mut() {
            replicator.set_creating();
        }
        self.state = ChannelState::AwaitingFirstReplication;
    }

    /// Uses the objects' current values as the new diff baseline
    pub fn refresh_shadows(&mut self, host: &dyn ObjectHost) {
        if let Some(values) = host.fields(self.root.handle()) {
            self.root.refresh_shadow(values);
        }
        for replicator in self.subobjects.values_mut() {
            if let Some(values) = host.fields(replicator.handle()) {
                replicator.refresh_shadow(values);
            }
        }
    }

    /// Runs one replicate pass: a delta for the root and each live
    /// sub-object, plus the sub-objects whose handles died since last pass.
    pub fn replicate(
        &mut self,
        trackers: &HashMap<TypeHandle, ChangeTracker>,
        host: &dyn ObjectHost,
    ) -> Result<ReplicationOutput, ChannelError> {
        let mut output = ReplicationOutput::default();

        let dead: Vec<ObjectOffset> = self
            .subobjects
            .iter()
            .filter(|(_, replicator)| !host.is_alive(replicator.handle()))
            .map(|(offset, _)| *offset)
            .collect();
        for offset in dead {
            if let Some(replicator) = self.subobjects.remove(&offset) {
                output.removed_subobjects.push(RemovedSubobject {
                    offset,
                    handle: replicator.handle(),
                    type_handle: replicator.type_handle(),
                });
            }
        }

        let entity = self.entity;
        let replicators =
            std::iter::once(&mut self.root).chain(self.subobjects.values_mut());
        for replicator in replicators {
            let Some(tracker) = trackers.get(&replicator.type_handle()) else {
                continue;
            };
            let Some(current) = host.fields(replicator.handle()) else {
                continue;
            };
            let creating = replicator.is_creating();
            let changelist = replicator.compute_outgoing_delta(entity, tracker, current)?;
            if changelist.is_empty() {
                continue;
            }
            output.deltas.push(ObjectDelta {
                offset: replicator.offset(),
                handle: replicator.handle(),
                type_handle: replicator.type_handle(),
                changelist,
                creating,
            });
        }

        if output.deltas.is_empty() && output.removed_subobjects.is_empty() {
            self.empty_passes = self.empty_passes.saturating_add(1);
        } else {
            self.empty_passes = 0;
        }
        if self.state == ChannelState::AwaitingFirstReplication {
            self.state = ChannelState::Active;
        }

        Ok(output)
    }
}
