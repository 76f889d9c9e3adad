use replication_bridge::{ComponentData, FieldHandle, FieldValue, ObjectRef};

use crate::helpers::test_schema::{
    CHARACTER_CORE, CHARACTER_LINKS, DOOR_STATE, WEAPON_OWNER, WEAPON_STATE,
};

pub fn character_core(health: i64, name: &str) -> ComponentData {
    ComponentData::new(CHARACTER_CORE)
        .with_field(FieldHandle(0), FieldValue::Int(health))
        .with_field(FieldHandle(1), FieldValue::Bytes(name.as_bytes().to_vec()))
        .with_field(FieldHandle(4), FieldValue::Float(1.0))
}

pub fn health(health: i64) -> ComponentData {
    ComponentData::new(CHARACTER_CORE).with_field(FieldHandle(0), FieldValue::Int(health))
}

pub fn character_links(target: Option<ObjectRef>, squad: Vec<Option<ObjectRef>>) -> ComponentData {
    ComponentData::new(CHARACTER_LINKS)
        .with_field(FieldHandle(2), FieldValue::Ref(target))
        .with_field(
            FieldHandle(3),
            FieldValue::Array(squad.into_iter().map(FieldValue::Ref).collect()),
        )
}

pub fn target(target: Option<ObjectRef>) -> ComponentData {
    ComponentData::new(CHARACTER_LINKS).with_field(FieldHandle(2), FieldValue::Ref(target))
}

pub fn weapon_state(ammo: i64) -> ComponentData {
    ComponentData::new(WEAPON_STATE).with_field(FieldHandle(0), FieldValue::Int(ammo))
}

pub fn weapon_owner(serial: i64) -> ComponentData {
    ComponentData::new(WEAPON_OWNER).with_field(FieldHandle(1), FieldValue::Int(serial))
}

pub fn door_state(open: bool) -> ComponentData {
    ComponentData::new(DOOR_STATE).with_field(FieldHandle(0), FieldValue::Bool(open))
}
