pub mod context;
pub mod error;
pub mod events;
pub mod replication_bridge;

mod entity_processing;
mod outgoing;
mod rpc_routing;
