use crate::{
    constants::{METADATA_COMPONENT_ID, NET_OWNERSHIP_COMPONENT_ID, TOMBSTONE_COMPONENT_ID},
    world::binding::error::BindingError,
    ComponentData, EntityId, FieldHandle, FieldValue,
};

const CLASS_PATH_FIELD: FieldHandle = FieldHandle(0);
const WELL_KNOWN_PATH_FIELD: FieldHandle = FieldHandle(1);
const OWNER_WORKER_FIELD: FieldHandle = FieldHandle(0);

/// Metadata needed to pick a local type for an incoming entity
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EntityMetadata {
    pub class_path: String,
    /// Set for singletons and level-placed objects which already exist on
    /// every worker and must be bound rather than spawned
    pub well_known_path: Option<String>,
}

impl EntityMetadata {
    pub fn new(class_path: &str) -> Self {
        Self {
            class_path: class_path.to_string(),
            well_known_path: None,
        }
    }

    pub fn well_known(class_path: &str, path: &str) -> Self {
        Self {
            class_path: class_path.to_string(),
            well_known_path: Some(path.to_string()),
        }
    }

    pub fn from_component(entity: EntityId, data: &ComponentData) -> Result<Self, BindingError> {
        let class_path = read_string(entity, data, CLASS_PATH_FIELD)?.ok_or(
            BindingError::InvalidCreationData {
                entity_id: entity.to_string(),
                component: data.component,
                reason: "missing class path",
            },
        )?;
        let well_known_path = read_string(entity, data, WELL_KNOWN_PATH_FIELD)?;
        Ok(Self {
            class_path,
            well_known_path,
        })
    }

    pub fn to_component(&self) -> ComponentData {
        let mut data = ComponentData::new(METADATA_COMPONENT_ID).with_field(
            CLASS_PATH_FIELD,
            FieldValue::Bytes(self.class_path.as_bytes().to_vec()),
        );
        if let Some(path) = &self.well_known_path {
            data = data.with_field(WELL_KNOWN_PATH_FIELD, FieldValue::Bytes(path.as_bytes().to_vec()));
        }
        data
    }
}

/// Names the worker that owns the entity for owner-only visibility
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetOwnership {
    pub owner_worker: Option<String>,
}

impl NetOwnership {
    pub fn from_component(entity: EntityId, data: &ComponentData) -> Result<Self, BindingError> {
        Ok(Self {
            owner_worker: read_string(entity, data, OWNER_WORKER_FIELD)?,
        })
    }

    pub fn to_component(&self) -> ComponentData {
        let data = ComponentData::new(NET_OWNERSHIP_COMPONENT_ID);
        match &self.owner_worker {
            Some(worker) => {
                data.with_field(OWNER_WORKER_FIELD, FieldValue::Bytes(worker.as_bytes().to_vec()))
            }
            None => data,
        }
    }
}

/// Typed store of the creation-relevant components of one entity
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CreationData {
    pub metadata: Option<EntityMetadata>,
    pub ownership: Option<NetOwnership>,
    pub tombstoned: bool,
}

impl CreationData {
    pub fn is_creation_component(component: u32) -> bool {
        matches!(
            component,
            METADATA_COMPONENT_ID | NET_OWNERSHIP_COMPONENT_ID | TOMBSTONE_COMPONENT_ID
        )
    }

    /// Records a creation-relevant component. Other components are ignored.
    pub fn store(&mut self, entity: EntityId, data: &ComponentData) -> Result<(), BindingError> {
        match data.component {
            METADATA_COMPONENT_ID => {
                self.metadata = Some(EntityMetadata::from_component(entity, data)?);
            }
            NET_OWNERSHIP_COMPONENT_ID => {
                self.ownership = Some(NetOwnership::from_component(entity, data)?);
            }
            TOMBSTONE_COMPONENT_ID => {
                self.tombstoned = true;
            }
            _ => {}
        }
        Ok(())
    }

    pub fn is_owned_by(&self, worker_id: &str) -> bool {
        self.ownership
            .as_ref()
            .and_then(|ownership| ownership.owner_worker.as_deref())
            .map(|owner| owner == worker_id)
            .unwrap_or(false)
    }
}

fn read_string(
    entity: EntityId,
    data: &ComponentData,
    handle: FieldHandle,
) -> Result<Option<String>, BindingError> {
    match data.field(handle) {
        None => Ok(None),
        Some(FieldValue::Bytes(bytes)) => String::from_utf8(bytes.clone())
            .map(Some)
            .map_err(|_| BindingError::InvalidCreationData {
                entity_id: entity.to_string(),
                component: data.component,
                reason: "string field is not utf-8",
            }),
        Some(_) => Err(BindingError::InvalidCreationData {
            entity_id: entity.to_string(),
            component: data.component,
            reason: "string field holds a non-bytes value",
        }),
    }
}
