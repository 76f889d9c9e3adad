use crate::ComponentId;

// Well-known components carried by every replicated entity

/// Class path (and optional well-known object path) used to pick a local type
pub const METADATA_COMPONENT_ID: ComponentId = 1;
/// Name of the worker owning the entity, used for owner-only visibility
pub const NET_OWNERSHIP_COMPONENT_ID: ComponentId = 2;
/// Present while the entity's authoritative worker has it dormant
pub const DORMANT_COMPONENT_ID: ComponentId = 3;
/// Marks a retired startup object which must stay deleted on every worker
pub const TOMBSTONE_COMPONENT_ID: ComponentId = 4;

/// First component id available to user schemas
pub const FIRST_SCHEMA_COMPONENT_ID: ComponentId = 100;

pub const DEFAULT_HISTORY_CAPACITY: usize = 32;
pub const DEFAULT_MAX_FIELDS_PER_MESSAGE: usize = 256;
pub const DEFAULT_DORMANCY_THRESHOLD: u32 = 3;
pub const DEFAULT_RING_BUFFER_SLOTS: u32 = 32;
pub const DEFAULT_UNRELIABLE_QUEUE_LIMIT: usize = 64;
pub const DEFAULT_ENTITY_ID_BATCH_SIZE: u32 = 64;
pub const DEFAULT_ENTITY_ID_LOW_WATERMARK: usize = 8;

pub fn is_well_known_component(component: ComponentId) -> bool {
    component < FIRST_SCHEMA_COMPONENT_ID
}
