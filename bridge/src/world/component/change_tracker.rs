use crate::{
    world::component::{
        changelist::Changelist, diff_mask::DiffMask, error::ComponentError,
        shadow_state::ShadowState,
    },
    FieldHandle, FieldKind, FieldLayout, FieldValue, TypeHandle,
};

type FieldComparator = fn(&FieldValue, &FieldValue) -> bool;

/// Per-type property change tracker.
///
/// Each field's kind is matched once, at construction, into a comparator
/// table; comparisons afterwards are a plain indexed call per field.
pub struct ChangeTracker {
    type_handle: TypeHandle,
    layout: FieldLayout,
    comparators: Vec<FieldComparator>,
}

impl ChangeTracker {
    pub fn new(type_handle: TypeHandle, layout: &FieldLayout) -> Self {
        let comparators = layout
            .iter()
            .map(|descriptor| comparator_for(descriptor.kind()))
            .collect();
        Self {
            type_handle,
            layout: layout.clone(),
            comparators,
        }
    }

    pub fn type_handle(&self) -> TypeHandle {
        self.type_handle
    }

    pub fn layout(&self) -> &FieldLayout {
        &self.layout
    }

    pub fn field_count(&self) -> usize {
        self.comparators.len()
    }

    pub fn is_indexable(&self, handle: FieldHandle) -> bool {
        self.layout
            .descriptor(handle)
            .map(|descriptor| descriptor.kind().is_indexable())
            .unwrap_or(false)
    }

    /// Whether `old` and `new` differ for the given field
    pub fn field_changed(&self, handle: FieldHandle, old: &FieldValue, new: &FieldValue) -> bool {
        match self.comparators.get(handle.index()) {
            Some(equal) => !equal(old, new),
            None => true,
        }
    }

    /// Computes the changed fields of `current` against `shadow`, without
    /// touching the shadow.
    pub fn compare(
        &self,
        shadow: &ShadowState,
        current: &[FieldValue],
    ) -> Result<Changelist, ComponentError> {
        self.check_len(current.len())?;
        let mut changed = Changelist::new();
        for (index, equal) in self.comparators.iter().enumerate() {
            let handle = FieldHandle(index as u16);
            let unchanged = shadow
                .value(handle)
                .map(|old| equal(old, &current[index]))
                .unwrap_or(false);
            if !unchanged {
                changed.insert(handle);
            }
        }
        Ok(changed)
    }

    /// Computes the changed fields and copies them into the shadow, so the
    /// shadow becomes the baseline for the next pass.
    pub fn compare_and_update(
        &self,
        shadow: &mut ShadowState,
        current: &[FieldValue],
    ) -> Result<Changelist, ComponentError> {
        if shadow.len() != current.len() {
            self.check_len(current.len())?;
            shadow.refresh(current);
            return Ok(self.full_changelist());
        }
        let changed = self.compare(shadow, current)?;
        for handle in changed.iter() {
            shadow.set(*handle, current[handle.index()].clone());
        }
        Ok(changed)
    }

    /// Set union of several changelists, de-duplicated on field handle
    pub fn merge<'a>(&self, changelists: impl IntoIterator<Item = &'a Changelist>) -> Changelist {
        let mut mask = DiffMask::new(self.field_count());
        for changelist in changelists {
            let mut other = DiffMask::new(self.field_count());
            for handle in changelist.iter() {
                other.set_bit(*handle, true);
            }
            mask.or(&other);
        }
        Changelist::from_handles(mask.iter_set())
    }

    pub fn full_changelist(&self) -> Changelist {
        Changelist::from_handles(self.layout.handles())
    }

    /// Validates a payload value against the declared kind of its field
    pub fn check_value(&self, handle: FieldHandle, value: &FieldValue) -> Result<(), ComponentError> {
        let Some(descriptor) = self.layout.descriptor(handle) else {
            return Err(ComponentError::UnknownField {
                type_handle: self.type_handle.0,
                field: handle.0,
            });
        };
        if !value.matches_kind(descriptor.kind()) {
            return Err(ComponentError::KindMismatch {
                type_handle: self.type_handle.0,
                field: handle.0,
                found: value.kind_name(),
            });
        }
        Ok(())
    }

    fn check_len(&self, actual: usize) -> Result<(), ComponentError> {
        if actual != self.field_count() {
            return Err(ComponentError::LayoutMismatch {
                type_handle: self.type_handle.0,
                expected: self.field_count(),
                actual,
            });
        }
        Ok(())
    }
}

fn comparator_for(kind: &FieldKind) -> FieldComparator {
    match kind {
        FieldKind::Bool | FieldKind::Int | FieldKind::Bytes | FieldKind::Object => plain_eq,
        FieldKind::Float => float_eq,
        FieldKind::Array(_) | FieldKind::Struct(_) => deep_eq,
    }
}

fn plain_eq(a: &FieldValue, b: &FieldValue) -> bool {
    a == b
}

// bitwise, so a NaN doesn't replicate every pass
fn float_eq(a: &FieldValue, b: &FieldValue) -> bool {
    match (a, b) {
        (FieldValue::Float(x), FieldValue::Float(y)) => x.to_bits() == y.to_bits(),
        _ => a == b,
    }
}

fn deep_eq(a: &FieldValue, b: &FieldValue) -> bool {
    match (a, b) {
        (FieldValue::Array(xs), FieldValue::Array(ys))
        | (FieldValue::Struct(xs), FieldValue::Struct(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys.iter()).all(|(x, y)| deep_eq(x, y))
        }
        (FieldValue::Float(_), FieldValue::Float(_)) => float_eq(a, b),
        _ => a == b,
    }
}
