pub mod checked_map;
pub mod creation_data;
pub mod entity_id_pool;
pub mod error;
pub mod object_binding_table;
pub mod pending_subobject;
