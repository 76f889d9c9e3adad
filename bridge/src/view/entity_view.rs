use crate::{
    rpc::rpc_category::RpcCategory, AuthorityDomain, ComponentData, ComponentId, EntityId,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityDeltaKind {
    Add,
    Remove,
    Update,
    /// The entity left this worker's view for a while; it isn't deleted
    TemporarilyRemoved,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ComponentChange {
    Added(ComponentData),
    Updated(ComponentData),
    Removed(ComponentId),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthorityChange {
    Gained(AuthorityDomain),
    Lost(AuthorityDomain),
}

#[derive(Clone, Debug, PartialEq)]
pub struct EntityDelta {
    pub entity: EntityId,
    pub kind: EntityDeltaKind,
    pub component_changes: Vec<ComponentChange>,
    pub authority_changes: Vec<AuthorityChange>,
}

impl EntityDelta {
    pub fn new(entity: EntityId, kind: EntityDeltaKind) -> Self {
        Self {
            entity,
            kind,
            component_changes: Vec::new(),
            authority_changes: Vec::new(),
        }
    }
}

/// Wire-visible state of one ring buffer: the sender's published count and
/// the slot contents
pub struct RingBufferSnapshot<'a, P> {
    pub count_written: u64,
    pub slots: &'a [Option<P>],
}

/// Read-only, deduplicated view of the remote entity store as seen by this
/// worker.
pub trait EntityView<P> {
    /// Ordered deltas delivered since the previous tick
    fn deltas_since_last_tick(&self) -> &[EntityDelta];
    fn has_entity(&self, entity: EntityId) -> bool;
    fn has_component(&self, entity: EntityId, component: ComponentId) -> bool;
    fn get_component(&self, entity: EntityId, component: ComponentId) -> Option<&ComponentData>;
    fn component_ids(&self, entity: EntityId) -> Vec<ComponentId>;
    fn rpc_ring(&self, entity: EntityId, category: RpcCategory) -> Option<RingBufferSnapshot<'_, P>>;
    /// Ack count the receiver of `category` published
    fn rpc_ack(&self, entity: EntityId, category: RpcCategory) -> Option<u64>;
}
