pub mod entity_view;
pub mod host;
pub mod schema;
pub mod wire;
