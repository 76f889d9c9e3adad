use thiserror::Error;

use crate::world::component::error::ComponentError;

/// Errors that can occur during ReplicationChannel operations
///
/// History overflow, index regression and duplicate creation are protocol
/// violations: they mean a logic defect upstream and abort the current
/// operation for the affected entity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// The history ring would hold `capacity` or more unsent changelists
    #[error("Changelist history of entity {entity_id} overflowed: {pending} pending with capacity {capacity}")]
    HistoryOverflow {
        entity_id: String,
        pending: u32,
        capacity: u32,
    },

    /// The channel's last sent index fell outside the live history window
    #[error("Changelist index of entity {entity_id} regressed: last sent {last_sent} outside [{start}, {end}]")]
    ChangelistIndexRegressed {
        entity_id: String,
        last_sent: u32,
        start: u32,
        end: u32,
    },

    /// A replicator already exists for this (entity, offset)
    #[error("Entity {entity_id} already replicates an object at offset {offset}")]
    DuplicateObject { entity_id: String, offset: u32 },

    /// State machine transition not allowed from the current state
    #[error("Channel of entity {entity_id} cannot {operation} while {state}")]
    InvalidTransition {
        entity_id: String,
        operation: &'static str,
        state: String,
    },

    /// The host object no longer matches its type layout
    #[error("Entity {entity_id} at offset {offset}: {source}")]
    Component {
        entity_id: String,
        offset: u32,
        #[source]
        source: ComponentError,
    },
}
