use crate::{FieldHandle, FieldLayout, FieldValue};

/// Last-replicated copy of an object's field values, the baseline every
/// outgoing delta is computed against.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ShadowState {
    values: Vec<FieldValue>,
}

impl ShadowState {
    pub fn from_layout(layout: &FieldLayout) -> Self {
        Self {
            values: layout.default_values(),
        }
    }

    pub fn from_values(values: &[FieldValue]) -> Self {
        Self {
            values: values.to_vec(),
        }
    }

    /// Replaces the whole baseline with the object's current values
    pub fn refresh(&mut self, current: &[FieldValue]) {
        self.values.clear();
        self.values.extend_from_slice(current);
    }

    pub fn value(&self, handle: FieldHandle) -> Option<&FieldValue> {
        self.values.get(handle.index())
    }

    pub fn set(&mut self, handle: FieldHandle, value: FieldValue) {
        if let Some(slot) = self.values.get_mut(handle.index()) {
            *slot = value;
        }
    }

    pub fn values(&self) -> &[FieldValue] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
