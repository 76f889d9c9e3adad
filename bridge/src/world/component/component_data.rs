use crate::{ComponentId, FieldHandle, FieldValue};

/// Visibility class of a component, deciding which workers ever see it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReplicationCategory {
    AlwaysVisible,
    /// Only visible to the worker named by the entity's net-ownership data
    OwnerOnly,
    /// Only visible to the worker holding primary authority
    AuthorityOnly,
    /// Sent once with the entity's initial state, never updated
    FirstFrameOnly,
}

/// A component payload: values for a subset of one object's fields.
#[derive(Clone, Debug, PartialEq)]
pub struct ComponentData {
    pub component: ComponentId,
    pub fields: Vec<(FieldHandle, FieldValue)>,
}

impl ComponentData {
    pub fn new(component: ComponentId) -> Self {
        Self {
            component,
            fields: Vec::new(),
        }
    }

    pub fn with_field(mut self, handle: FieldHandle, value: FieldValue) -> Self {
        self.fields.push((handle, value));
        self
    }

    pub fn field(&self, handle: FieldHandle) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(field, _)| *field == handle)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
