use crate::{rpc::rpc_category::RpcCategory, ComponentData, ComponentId, EntityId};

#[derive(Clone, Debug, PartialEq)]
pub enum CommandRequest {
    ReserveEntityIds { count: u32 },
    CreateEntity {
        entity: EntityId,
        components: Vec<ComponentData>,
    },
    DeleteEntity { entity: EntityId },
}

#[derive(Clone, Debug, PartialEq)]
pub enum CommandResponse {
    EntityIdsReserved { first: EntityId, count: u32 },
    EntityIdReservationFailed,
    EntityCreated { entity: EntityId, success: bool },
    EntityDeleted { entity: EntityId, success: bool },
}

/// Outgoing operations towards the store. Everything is fire-and-forget:
/// confirmation, if any, comes back later through the entity view.
pub trait WireSender<P> {
    fn send_component_add(&mut self, entity: EntityId, data: ComponentData);
    fn send_component_update(&mut self, entity: EntityId, data: ComponentData);
    fn send_component_remove(&mut self, entity: EntityId, component: ComponentId);
    fn send_command_request(&mut self, request: CommandRequest);
    fn send_command_response(&mut self, response: CommandResponse);
    fn write_rpc_slot(&mut self, entity: EntityId, category: RpcCategory, slot: u32, payload: P);
    fn publish_rpc_count(&mut self, entity: EntityId, category: RpcCategory, count_written: u64);
    fn publish_rpc_ack(&mut self, entity: EntityId, category: RpcCategory, ack: u64);
}
