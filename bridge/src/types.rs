use std::fmt;

/// Identifier of an entity in the shared entity-component store.
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug, PartialOrd, Ord)]
pub struct EntityId(u64);

impl EntityId {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn to_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub type ComponentId = u32;

/// Distinguishes the root object of an entity (offset 0) from its attached sub-objects.
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug, PartialOrd, Ord, Default)]
pub struct ObjectOffset(u32);

impl ObjectOffset {
    pub const ROOT: ObjectOffset = ObjectOffset(0);

    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    pub fn is_root(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for ObjectOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An (entity, offset) pair naming a replicated object, whether or not it is
/// locally resolvable yet.
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug, PartialOrd, Ord)]
pub struct ObjectRef {
    pub entity: EntityId,
    pub offset: ObjectOffset,
}

impl ObjectRef {
    pub fn new(entity: EntityId, offset: ObjectOffset) -> Self {
        Self { entity, offset }
    }

    pub fn root(entity: EntityId) -> Self {
        Self::new(entity, ObjectOffset::ROOT)
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.entity, self.offset.0)
    }
}

/// Handle to a local object type, issued by the schema resolver.
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug, PartialOrd, Ord)]
pub struct TypeHandle(pub u32);

/// Wire handle of a top-level field within a type's layout.
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug, PartialOrd, Ord)]
pub struct FieldHandle(pub u16);

impl FieldHandle {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AuthorityDomain {
    /// Server-like authority: owns the replicated state of the entity
    Primary,
    /// Client-like authority: owns input-side state and client-bound RPCs
    Secondary,
}

impl AuthorityDomain {
    pub fn invert(self) -> Self {
        match self {
            AuthorityDomain::Primary => AuthorityDomain::Secondary,
            AuthorityDomain::Secondary => AuthorityDomain::Primary,
        }
    }
}

impl fmt::Display for AuthorityDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthorityDomain::Primary => write!(f, "primary"),
            AuthorityDomain::Secondary => write!(f, "secondary"),
        }
    }
}
