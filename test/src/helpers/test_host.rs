use std::collections::HashMap;

use replication_bridge::{
    AuthorityDomain, EntityMetadata, FieldHandle, FieldLayout, FieldValue, ObjectArena,
    ObjectHandle, ObjectHost, TypeHandle,
};

use crate::helpers::test_schema::TestSchema;

pub struct TestObject {
    pub type_handle: TypeHandle,
    pub fields: Vec<FieldValue>,
    pub outer: Option<ObjectHandle>,
    pub well_known_path: Option<String>,
}

/// Local object graph backed by an arena. Records every callback the
/// bridge makes so tests can assert on them.
pub struct TestHost {
    objects: ObjectArena<TestObject>,
    layouts: HashMap<TypeHandle, FieldLayout>,
    pub notifications: Vec<(ObjectHandle, Vec<FieldHandle>)>,
    pub authority_changes: Vec<(ObjectHandle, AuthorityDomain, bool)>,
    pub destroyed: Vec<ObjectHandle>,
    pub refuse_spawn: bool,
}

impl TestHost {
    pub fn new(schema: &TestSchema) -> Self {
        let mut layouts = HashMap::new();
        for type_handle in [
            crate::CHARACTER_TYPE,
            crate::WEAPON_TYPE,
            crate::DOOR_TYPE,
            crate::WIDE_TYPE,
        ] {
            layouts.insert(type_handle, schema.layout(type_handle).clone());
        }
        Self {
            objects: ObjectArena::new(),
            layouts,
            notifications: Vec::new(),
            authority_changes: Vec::new(),
            destroyed: Vec::new(),
            refuse_spawn: false,
        }
    }

    /// Creates an object directly, as game code would
    pub fn spawn(&mut self, type_handle: TypeHandle) -> ObjectHandle {
        let fields = self.default_fields(type_handle);
        self.objects.insert(TestObject {
            type_handle,
            fields,
            outer: None,
            well_known_path: None,
        })
    }

    /// Creates a level-placed object that incoming entities bind to by path
    pub fn spawn_well_known(&mut self, type_handle: TypeHandle, path: &str) -> ObjectHandle {
        let fields = self.default_fields(type_handle);
        self.objects.insert(TestObject {
            type_handle,
            fields,
            outer: None,
            well_known_path: Some(path.to_string()),
        })
    }

    fn default_fields(&self, type_handle: TypeHandle) -> Vec<FieldValue> {
        self.layouts
            .get(&type_handle)
            .map(|layout| layout.default_values())
            .unwrap_or_default()
    }

    pub fn object(&self, handle: ObjectHandle) -> Option<&TestObject> {
        self.objects.get(handle)
    }

    pub fn field(&self, handle: ObjectHandle, field: u16) -> Option<&FieldValue> {
        self.objects
            .get(handle)
            .and_then(|object| object.fields.get(field as usize))
    }

    pub fn set_field(&mut self, handle: ObjectHandle, field: u16, value: FieldValue) {
        let object = self.objects.get_mut(handle).expect("object is alive");
        object.fields[field as usize] = value;
    }

    pub fn live_count(&self) -> usize {
        self.objects.len()
    }

    pub fn notifications_for(&self, handle: ObjectHandle) -> Vec<FieldHandle> {
        self.notifications
            .iter()
            .filter(|(notified, _)| *notified == handle)
            .flat_map(|(_, fields)| fields.iter().copied())
            .collect()
    }

    pub fn clear_records(&mut self) {
        self.notifications.clear();
        self.authority_changes.clear();
        self.destroyed.clear();
    }
}

impl ObjectHost for TestHost {
    fn spawn_object(&mut self, type_handle: TypeHandle, _metadata: &EntityMetadata) -> Option<ObjectHandle> {
        if self.refuse_spawn {
            return None;
        }
        Some(self.spawn(type_handle))
    }

    fn spawn_subobject(&mut self, outer: ObjectHandle, type_handle: TypeHandle) -> Option<ObjectHandle> {
        if self.refuse_spawn || !self.objects.is_alive(outer) {
            return None;
        }
        let fields = self.default_fields(type_handle);
        Some(self.objects.insert(TestObject {
            type_handle,
            fields,
            outer: Some(outer),
            well_known_path: None,
        }))
    }

    fn find_well_known(&self, metadata: &EntityMetadata) -> Option<ObjectHandle> {
        let path = metadata.well_known_path.as_deref()?;
        self.objects
            .iter_live()
            .find(|(_, object)| object.well_known_path.as_deref() == Some(path))
            .map(|(handle, _)| handle)
    }

    fn destroy_object(&mut self, handle: ObjectHandle) {
        if self.objects.kill(handle) {
            self.destroyed.push(handle);
        }
    }

    fn is_alive(&self, handle: ObjectHandle) -> bool {
        self.objects.is_alive(handle)
    }

    fn fields(&self, handle: ObjectHandle) -> Option<&[FieldValue]> {
        self.objects.get(handle).map(|object| object.fields.as_slice())
    }

    fn fields_mut(&mut self, handle: ObjectHandle) -> Option<&mut [FieldValue]> {
        self.objects
            .get_mut(handle)
            .map(|object| object.fields.as_mut_slice())
    }

    fn rep_notify(&mut self, handle: ObjectHandle, fields: &[FieldHandle]) {
        self.notifications.push((handle, fields.to_vec()));
    }

    fn authority_changed(&mut self, handle: ObjectHandle, domain: AuthorityDomain, authoritative: bool) {
        self.authority_changes.push((handle, domain, authoritative));
    }
}
