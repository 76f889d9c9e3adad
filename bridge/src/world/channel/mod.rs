pub mod changelist_history;
pub mod error;
pub mod object_replicator;
pub mod replication_channel;
