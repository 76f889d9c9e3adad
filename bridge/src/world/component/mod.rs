pub mod change_tracker;
pub mod changelist;
pub mod component_data;
pub mod diff_mask;
pub mod error;
pub mod field;
pub mod shadow_state;
