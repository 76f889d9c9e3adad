use crate::FieldHandle;

/// An ordered, de-duplicated list of changed field handles, relative to a
/// shadow state snapshot.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Changelist {
    handles: Vec<FieldHandle>,
}

impl Changelist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_handles(handles: impl IntoIterator<Item = FieldHandle>) -> Self {
        let mut handles: Vec<FieldHandle> = handles.into_iter().collect();
        handles.sort();
        handles.dedup();
        Self { handles }
    }

    pub fn insert(&mut self, handle: FieldHandle) {
        if let Err(position) = self.handles.binary_search(&handle) {
            self.handles.insert(position, handle);
        }
    }

    pub fn contains(&self, handle: FieldHandle) -> bool {
        self.handles.binary_search(&handle).is_ok()
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FieldHandle> {
        self.handles.iter()
    }

    pub fn handles(&self) -> &[FieldHandle] {
        &self.handles
    }

    pub fn clear(&mut self) {
        self.handles.clear();
    }
}

impl<'a> IntoIterator for &'a Changelist {
    type Item = &'a FieldHandle;
    type IntoIter = std::slice::Iter<'a, FieldHandle>;

    fn into_iter(self) -> Self::IntoIter {
        self.handles.iter()
    }
}
