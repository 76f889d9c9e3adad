use std::collections::HashSet;

use crate::{ComponentData, ComponentId, TypeHandle};

/// Components received so far for a sub-object that isn't instantiated yet
pub struct PendingSubobject {
    type_handle: TypeHandle,
    expected: HashSet<ComponentId>,
    received: Vec<ComponentData>,
}

impl PendingSubobject {
    pub fn new(type_handle: TypeHandle, expected: HashSet<ComponentId>) -> Self {
        Self {
            type_handle,
            expected,
            received: Vec::new(),
        }
    }

    pub fn type_handle(&self) -> TypeHandle {
        self.type_handle
    }

    /// Records a component, replacing earlier data for the same component
    pub fn accept(&mut self, data: ComponentData) {
        self.received
            .retain(|existing| existing.component != data.component);
        self.received.push(data);
    }

    pub fn forget(&mut self, component: ComponentId) {
        self.received.retain(|existing| existing.component != component);
    }

    pub fn is_complete(&self) -> bool {
        self.expected.iter().all(|component| {
            self.received
                .iter()
                .any(|data| data.component == *component)
        })
    }

    pub fn missing(&self) -> Vec<ComponentId> {
        let mut missing: Vec<ComponentId> = self
            .expected
            .iter()
            .filter(|component| !self.received.iter().any(|data| data.component == **component))
            .copied()
            .collect();
        missing.sort();
        missing
    }

    pub fn into_components(self) -> Vec<ComponentData> {
        self.received
    }
}
