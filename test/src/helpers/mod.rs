pub mod components;
pub mod test_host;
pub mod test_schema;
pub mod test_wire;

pub use components::{
    character_core, character_links, door_state, health, target, weapon_owner, weapon_state,
};
pub use deliver::{deliver_rpcs, deliver_updates};
pub use test_host::{TestHost, TestObject};
pub use test_rpc::TestRpc;
pub use test_schema::{
    TestSchema, CHARACTER_CORE, CHARACTER_LINKS, CHARACTER_TYPE, DOOR_STATE, DOOR_TYPE,
    WEAPON_OFFSET, WEAPON_OWNER, WEAPON_STATE, WEAPON_TYPE, WIDE_STATE, WIDE_TYPE,
};
pub use test_view::TestEntityView;
pub use test_wire::TestWire;
pub use test_worker::TestWorker;
