use crate::{FieldHandle, ObjectHandle, ObjectRef};

/// The finite set of field kinds a replicated type may declare.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldKind {
    Bool,
    Int,
    Float,
    Bytes,
    /// A reference to another replicated object
    Object,
    /// Indexable container of a single element kind
    Array(Box<FieldKind>),
    Struct(Vec<FieldKind>),
}

impl FieldKind {
    pub fn is_indexable(&self) -> bool {
        matches!(self, FieldKind::Array(_))
    }

    pub fn contains_references(&self) -> bool {
        match self {
            FieldKind::Object => true,
            FieldKind::Array(inner) => inner.contains_references(),
            FieldKind::Struct(kinds) => kinds.iter().any(|kind| kind.contains_references()),
            _ => false,
        }
    }
}

/// A field value. Object references have two forms: `Object` is the local
/// form held by instantiated objects, `Ref` is the wire form carried in
/// component payloads.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Bytes(Vec<u8>),
    Object(Option<ObjectHandle>),
    Ref(Option<ObjectRef>),
    Array(Vec<FieldValue>),
    Struct(Vec<FieldValue>),
}

impl FieldValue {
    pub fn default_for(kind: &FieldKind) -> Self {
        match kind {
            FieldKind::Bool => FieldValue::Bool(false),
            FieldKind::Int => FieldValue::Int(0),
            FieldKind::Float => FieldValue::Float(0.0),
            FieldKind::Bytes => FieldValue::Bytes(Vec::new()),
            FieldKind::Object => FieldValue::Object(None),
            FieldKind::Array(_) => FieldValue::Array(Vec::new()),
            FieldKind::Struct(kinds) => {
                FieldValue::Struct(kinds.iter().map(FieldValue::default_for).collect())
            }
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            FieldValue::Bool(_) => "bool",
            FieldValue::Int(_) => "int",
            FieldValue::Float(_) => "float",
            FieldValue::Bytes(_) => "bytes",
            FieldValue::Object(_) => "object",
            FieldValue::Ref(_) => "reference",
            FieldValue::Array(_) => "array",
            FieldValue::Struct(_) => "struct",
        }
    }

    /// Whether this value is a valid instance of `kind`, in either reference form.
    pub fn matches_kind(&self, kind: &FieldKind) -> bool {
        match (self, kind) {
            (FieldValue::Bool(_), FieldKind::Bool)
            | (FieldValue::Int(_), FieldKind::Int)
            | (FieldValue::Float(_), FieldKind::Float)
            | (FieldValue::Bytes(_), FieldKind::Bytes)
            | (FieldValue::Object(_), FieldKind::Object)
            | (FieldValue::Ref(_), FieldKind::Object) => true,
            (FieldValue::Array(items), FieldKind::Array(inner)) => {
                items.iter().all(|item| item.matches_kind(inner))
            }
            (FieldValue::Struct(items), FieldKind::Struct(kinds)) => {
                items.len() == kinds.len()
                    && items
                        .iter()
                        .zip(kinds.iter())
                        .all(|(item, kind)| item.matches_kind(kind))
            }
            _ => false,
        }
    }

    pub fn get_at_path(&self, path: &[u16]) -> Option<&FieldValue> {
        let Some((first, rest)) = path.split_first() else {
            return Some(self);
        };
        match self {
            FieldValue::Array(items) | FieldValue::Struct(items) => {
                items.get(*first as usize)?.get_at_path(rest)
            }
            _ => None,
        }
    }

    /// Writes `value` at the nested `path`, returning false if the path does
    /// not exist in this value.
    pub fn set_at_path(&mut self, path: &[u16], value: FieldValue) -> bool {
        let Some((first, rest)) = path.split_first() else {
            *self = value;
            return true;
        };
        match self {
            FieldValue::Array(items) | FieldValue::Struct(items) => {
                match items.get_mut(*first as usize) {
                    Some(item) => item.set_at_path(rest, value),
                    None => false,
                }
            }
            _ => false,
        }
    }
}

/// Location of a value inside an object: a top-level field plus the
/// indices walked through nested arrays and structs.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldPath {
    field: FieldHandle,
    nested: Vec<u16>,
}

impl FieldPath {
    pub fn top_level(field: FieldHandle) -> Self {
        Self {
            field,
            nested: Vec::new(),
        }
    }

    pub fn nested(field: FieldHandle, nested: Vec<u16>) -> Self {
        Self { field, nested }
    }

    pub fn field(&self) -> FieldHandle {
        self.field
    }

    pub fn nested_indices(&self) -> &[u16] {
        &self.nested
    }

    pub fn child(&self, index: u16) -> Self {
        let mut nested = self.nested.clone();
        nested.push(index);
        Self {
            field: self.field,
            nested,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RepNotifyCondition {
    Never,
    /// Fire when an incoming payload changes the field's value
    OnChanged,
    /// Fire for every incoming write, changed or not
    Always,
}

#[derive(Clone, Debug)]
pub struct FieldDescriptor {
    handle: FieldHandle,
    name: String,
    kind: FieldKind,
    rep_notify: RepNotifyCondition,
}

impl FieldDescriptor {
    pub fn new(name: &str, kind: FieldKind) -> Self {
        Self {
            handle: FieldHandle(0),
            name: name.to_string(),
            kind,
            rep_notify: RepNotifyCondition::Never,
        }
    }

    pub fn with_rep_notify(mut self, condition: RepNotifyCondition) -> Self {
        self.rep_notify = condition;
        self
    }

    pub fn handle(&self) -> FieldHandle {
        self.handle
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn rep_notify(&self) -> RepNotifyCondition {
        self.rep_notify
    }
}

/// Ordered field descriptors of one object type. Handles are assigned by
/// position.
#[derive(Clone, Debug, Default)]
pub struct FieldLayout {
    fields: Vec<FieldDescriptor>,
}

impl FieldLayout {
    pub fn new(fields: Vec<FieldDescriptor>) -> Self {
        let fields = fields
            .into_iter()
            .enumerate()
            .map(|(index, mut descriptor)| {
                descriptor.handle = FieldHandle(index as u16);
                descriptor
            })
            .collect();
        Self { fields }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn descriptor(&self, handle: FieldHandle) -> Option<&FieldDescriptor> {
        self.fields.get(handle.index())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FieldDescriptor> {
        self.fields.iter()
    }

    pub fn handles(&self) -> impl Iterator<Item = FieldHandle> + '_ {
        self.fields.iter().map(|descriptor| descriptor.handle)
    }

    pub fn default_values(&self) -> Vec<FieldValue> {
        self.fields
            .iter()
            .map(|descriptor| FieldValue::default_for(&descriptor.kind))
            .collect()
    }
}
