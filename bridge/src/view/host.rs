use crate::{AuthorityDomain, EntityMetadata, FieldHandle, FieldValue, ObjectHandle, TypeHandle};

/// The host's object system. Owns object lifetime; the bridge only keeps
/// handles and asks whether they're still alive.
pub trait ObjectHost {
    fn spawn_object(&mut self, type_handle: TypeHandle, metadata: &EntityMetadata) -> Option<ObjectHandle>;
    fn spawn_subobject(&mut self, outer: ObjectHandle, type_handle: TypeHandle) -> Option<ObjectHandle>;
    /// An object that already exists on every worker, like a singleton or a
    /// level-placed object
    fn find_well_known(&self, metadata: &EntityMetadata) -> Option<ObjectHandle>;
    fn destroy_object(&mut self, handle: ObjectHandle);
    fn is_alive(&self, handle: ObjectHandle) -> bool;
    fn fields(&self, handle: ObjectHandle) -> Option<&[FieldValue]>;
    fn fields_mut(&mut self, handle: ObjectHandle) -> Option<&mut [FieldValue]>;
    fn rep_notify(&mut self, handle: ObjectHandle, fields: &[FieldHandle]);
    fn authority_changed(&mut self, handle: ObjectHandle, domain: AuthorityDomain, authoritative: bool);
}
