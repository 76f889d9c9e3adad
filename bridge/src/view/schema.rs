use crate::{
    ComponentId, EntityMetadata, FieldHandle, FieldLayout, ObjectOffset, ReplicationCategory,
    TypeHandle,
};

/// A component of a type at a given offset, and the fields it carries
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComponentSchema {
    pub id: ComponentId,
    pub category: ReplicationCategory,
    pub fields: Vec<FieldHandle>,
}

/// Where a component id belongs
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ComponentInfo {
    pub type_handle: TypeHandle,
    pub offset: ObjectOffset,
    pub category: ReplicationCategory,
}

/// Maps entity metadata to local types and types to their wire layout
pub trait SchemaResolver {
    fn resolve_type(&self, metadata: &EntityMetadata) -> Option<TypeHandle>;
    /// Metadata announcing a locally created entity of this type
    fn type_metadata(&self, type_handle: TypeHandle) -> Option<EntityMetadata>;
    fn field_layout(&self, type_handle: TypeHandle) -> Option<&FieldLayout>;
    /// Components carrying the type's fields when placed at `offset`
    fn components_for(&self, type_handle: TypeHandle, offset: ObjectOffset) -> Vec<ComponentSchema>;
    fn component_info(&self, component: ComponentId) -> Option<ComponentInfo>;
}
