pub mod error;
pub mod ring_buffer_receiver;
pub mod ring_buffer_sender;
pub mod rpc_category;
pub mod rpc_queue;
