use std::collections::HashMap;

use replication_bridge::{
    CommandRequest, CommandResponse, ComponentData, ComponentId, EntityId, RpcCategory,
    WireSender,
};

use crate::helpers::test_rpc::TestRpc;

/// Records everything the bridge sends towards the store
#[derive(Default)]
pub struct TestWire {
    pub adds: Vec<(EntityId, ComponentData)>,
    pub updates: Vec<(EntityId, ComponentData)>,
    pub removes: Vec<(EntityId, ComponentId)>,
    pub requests: Vec<CommandRequest>,
    pub responses: Vec<CommandResponse>,
    pub rpc_slots: Vec<(EntityId, RpcCategory, u32, TestRpc)>,
    pub rpc_counts: HashMap<(EntityId, RpcCategory), u64>,
    pub rpc_acks: HashMap<(EntityId, RpcCategory), u64>,
    pub count_publications: usize,
}

impl TestWire {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn updates_for(&self, entity: EntityId, component: ComponentId) -> Vec<&ComponentData> {
        self.updates
            .iter()
            .filter(|(updated, data)| *updated == entity && data.component == component)
            .map(|(_, data)| data)
            .collect()
    }

    pub fn created_entities(&self) -> Vec<EntityId> {
        self.requests
            .iter()
            .filter_map(|request| match request {
                CommandRequest::CreateEntity { entity, .. } => Some(*entity),
                _ => None,
            })
            .collect()
    }

    pub fn rpc_names(&self, entity: EntityId, category: RpcCategory) -> Vec<String> {
        self.rpc_slots
            .iter()
            .filter(|(written, written_category, _, _)| *written == entity && *written_category == category)
            .map(|(_, _, _, payload)| payload.name.clone())
            .collect()
    }
}

impl WireSender<TestRpc> for TestWire {
    fn send_component_add(&mut self, entity: EntityId, data: ComponentData) {
        self.adds.push((entity, data));
    }

    fn send_component_update(&mut self, entity: EntityId, data: ComponentData) {
        self.updates.push((entity, data));
    }

    fn send_component_remove(&mut self, entity: EntityId, component: ComponentId) {
        self.removes.push((entity, component));
    }

    fn send_command_request(&mut self, request: CommandRequest) {
        self.requests.push(request);
    }

    fn send_command_response(&mut self, response: CommandResponse) {
        self.responses.push(response);
    }

    fn write_rpc_slot(&mut self, entity: EntityId, category: RpcCategory, slot: u32, payload: TestRpc) {
        self.rpc_slots.push((entity, category, slot, payload));
    }

    fn publish_rpc_count(&mut self, entity: EntityId, category: RpcCategory, count_written: u64) {
        self.rpc_counts.insert((entity, category), count_written);
        self.count_publications += 1;
    }

    fn publish_rpc_ack(&mut self, entity: EntityId, category: RpcCategory, ack: u64) {
        self.rpc_acks.insert((entity, category), ack);
    }
}
