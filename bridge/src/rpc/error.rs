use thiserror::Error;

/// Errors raised by the RPC ring buffer sender and receiver
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RpcError {
    /// This worker doesn't hold the counters for the pair, usually because
    /// it lacks the sending authority
    #[error("No {category} ring buffer state for entity {entity_id}")]
    NotTracked { entity_id: String, category: String },

    /// The receiver acknowledged slots which were never written
    #[error("Entity {entity_id} {category} acknowledged {ack} but only {written} were written")]
    AckBeyondWritten {
        entity_id: String,
        category: String,
        ack: u64,
        written: u64,
    },

    /// The sender overwrote slots before they were extracted
    #[error("Entity {entity_id} {category} lost {lost} calls to slot overwrite")]
    SlotsOverwritten {
        entity_id: String,
        category: String,
        lost: u64,
    },
}

/// Conditions reported by the local RPC queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueueError {
    /// The ring buffer had no capacity, so calls stay queued locally
    #[error("ring buffer full, calls deferred to the local queue")]
    BufferOverflow,
    /// The local queue itself reached its limit
    #[error("local rpc queue is full")]
    QueueFull,
}
