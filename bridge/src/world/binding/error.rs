use thiserror::Error;

/// Errors that can occur while binding entities to local objects
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindingError {
    /// A second object was bound to an (entity, offset) pair that already has one
    #[error("Object {object_ref} is already bound to a local object")]
    AlreadyBound { object_ref: String },

    /// A local object was bound to a second (entity, offset) pair
    #[error("Local object {handle} is already bound to {object_ref}")]
    ObjectAlreadyBound { handle: String, object_ref: String },

    /// Unique-key map insert collided with an existing key
    #[error("Cannot insert and replace value for key {key}")]
    DuplicateMapKey { key: String },

    /// Creation data component was missing or malformed
    #[error("Component {component} of entity {entity_id} is not valid creation data: {reason}")]
    InvalidCreationData {
        entity_id: String,
        component: u32,
        reason: &'static str,
    },
}
