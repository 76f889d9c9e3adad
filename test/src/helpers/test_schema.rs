use std::collections::HashMap;

use replication_bridge::{
    ComponentId, ComponentInfo, ComponentSchema, EntityMetadata, FieldDescriptor, FieldHandle,
    FieldKind, FieldLayout, ObjectOffset, RepNotifyCondition, ReplicationCategory, SchemaResolver,
    TypeHandle,
};

pub const CHARACTER_TYPE: TypeHandle = TypeHandle(1);
pub const WEAPON_TYPE: TypeHandle = TypeHandle(2);
pub const DOOR_TYPE: TypeHandle = TypeHandle(3);
pub const WIDE_TYPE: TypeHandle = TypeHandle(4);

pub const WEAPON_OFFSET: ObjectOffset = ObjectOffset::new(1);

/// health, name, speed
pub const CHARACTER_CORE: ComponentId = 100;
/// target, squad
pub const CHARACTER_LINKS: ComponentId = 101;
/// ammo
pub const WEAPON_STATE: ComponentId = 110;
/// serial, owner-only
pub const WEAPON_OWNER: ComponentId = 111;
/// open
pub const DOOR_STATE: ComponentId = 120;
/// eight integer fields
pub const WIDE_STATE: ComponentId = 130;

/// Field layouts and component mapping of a small game:
///
/// * `Game.Character` with fields health (0), name (1), target (2), squad (3)
///   and speed (4). Its weapon sub-object lives at offset 1.
/// * `Game.Weapon` with fields ammo (0) and serial (1)
/// * `Game.Door`, a well-known object with one field, open (0)
/// * `Game.Wide`, eight integer fields in one component
pub struct TestSchema {
    classes: HashMap<String, TypeHandle>,
    layouts: HashMap<TypeHandle, FieldLayout>,
    components: Vec<(ComponentSchema, ComponentInfo)>,
}

impl Default for TestSchema {
    fn default() -> Self {
        Self::new()
    }
}

impl TestSchema {
    pub fn new() -> Self {
        let mut schema = Self {
            classes: HashMap::new(),
            layouts: HashMap::new(),
            components: Vec::new(),
        };

        schema.add_type(
            "Game.Character",
            CHARACTER_TYPE,
            FieldLayout::new(vec![
                FieldDescriptor::new("health", FieldKind::Int)
                    .with_rep_notify(RepNotifyCondition::OnChanged),
                FieldDescriptor::new("name", FieldKind::Bytes),
                FieldDescriptor::new("target", FieldKind::Object)
                    .with_rep_notify(RepNotifyCondition::OnChanged),
                FieldDescriptor::new("squad", FieldKind::Array(Box::new(FieldKind::Object)))
                    .with_rep_notify(RepNotifyCondition::OnChanged),
                FieldDescriptor::new("speed", FieldKind::Float),
            ]),
        );
        schema.add_type(
            "Game.Weapon",
            WEAPON_TYPE,
            FieldLayout::new(vec![
                FieldDescriptor::new("ammo", FieldKind::Int)
                    .with_rep_notify(RepNotifyCondition::OnChanged),
                FieldDescriptor::new("serial", FieldKind::Int),
            ]),
        );
        schema.add_type(
            "Game.Door",
            DOOR_TYPE,
            FieldLayout::new(vec![FieldDescriptor::new("open", FieldKind::Bool)
                .with_rep_notify(RepNotifyCondition::Always)]),
        );
        schema.add_type(
            "Game.Wide",
            WIDE_TYPE,
            FieldLayout::new(
                (0..8)
                    .map(|index| FieldDescriptor::new(&format!("value_{}", index), FieldKind::Int))
                    .collect(),
            ),
        );

        schema.add_component(
            CHARACTER_CORE,
            CHARACTER_TYPE,
            ObjectOffset::ROOT,
            ReplicationCategory::AlwaysVisible,
            &[0, 1, 4],
        );
        schema.add_component(
            CHARACTER_LINKS,
            CHARACTER_TYPE,
            ObjectOffset::ROOT,
            ReplicationCategory::AlwaysVisible,
            &[2, 3],
        );
        schema.add_component(
            WEAPON_STATE,
            WEAPON_TYPE,
            WEAPON_OFFSET,
            ReplicationCategory::AlwaysVisible,
            &[0],
        );
        schema.add_component(
            WEAPON_OWNER,
            WEAPON_TYPE,
            WEAPON_OFFSET,
            ReplicationCategory::OwnerOnly,
            &[1],
        );
        schema.add_component(
            DOOR_STATE,
            DOOR_TYPE,
            ObjectOffset::ROOT,
            ReplicationCategory::AlwaysVisible,
            &[0],
        );
        schema.add_component(
            WIDE_STATE,
            WIDE_TYPE,
            ObjectOffset::ROOT,
            ReplicationCategory::AlwaysVisible,
            &[0, 1, 2, 3, 4, 5, 6, 7],
        );

        schema
    }

    fn add_type(&mut self, class_path: &str, type_handle: TypeHandle, layout: FieldLayout) {
        self.classes.insert(class_path.to_string(), type_handle);
        self.layouts.insert(type_handle, layout);
    }

    fn add_component(
        &mut self,
        id: ComponentId,
        type_handle: TypeHandle,
        offset: ObjectOffset,
        category: ReplicationCategory,
        fields: &[u16],
    ) {
        self.components.push((
            ComponentSchema {
                id,
                category,
                fields: fields.iter().map(|field| FieldHandle(*field)).collect(),
            },
            ComponentInfo {
                type_handle,
                offset,
                category,
            },
        ));
    }

    pub fn layout(&self, type_handle: TypeHandle) -> &FieldLayout {
        self.layouts
            .get(&type_handle)
            .expect("type is registered in the test schema")
    }

    pub fn class_path(&self, type_handle: TypeHandle) -> Option<&str> {
        self.classes
            .iter()
            .find(|(_, handle)| **handle == type_handle)
            .map(|(class_path, _)| class_path.as_str())
    }
}

impl SchemaResolver for TestSchema {
    fn resolve_type(&self, metadata: &EntityMetadata) -> Option<TypeHandle> {
        self.classes.get(&metadata.class_path).copied()
    }

    fn type_metadata(&self, type_handle: TypeHandle) -> Option<EntityMetadata> {
        self.class_path(type_handle).map(EntityMetadata::new)
    }

    fn field_layout(&self, type_handle: TypeHandle) -> Option<&FieldLayout> {
        self.layouts.get(&type_handle)
    }

    fn components_for(&self, type_handle: TypeHandle, offset: ObjectOffset) -> Vec<ComponentSchema> {
        self.components
            .iter()
            .filter(|(_, info)| info.type_handle == type_handle && info.offset == offset)
            .map(|(schema, _)| schema.clone())
            .collect()
    }

    fn component_info(&self, component: ComponentId) -> Option<ComponentInfo> {
        self.components
            .iter()
            .find(|(schema, _)| schema.id == component)
            .map(|(_, info)| *info)
    }
}
