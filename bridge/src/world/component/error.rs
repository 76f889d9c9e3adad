use thiserror::Error;

/// Errors raised while comparing or applying field data against a layout
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComponentError {
    /// The object's field count differs from its type's layout
    #[error("Type {type_handle} expects {expected} fields but the object holds {actual}")]
    LayoutMismatch {
        type_handle: u32,
        expected: usize,
        actual: usize,
    },

    /// A payload names a field the layout doesn't declare
    #[error("Field {field} is not declared by type {type_handle}")]
    UnknownField { type_handle: u32, field: u16 },

    /// A payload value doesn't match the declared field kind
    #[error("Field {field} of type {type_handle} received a {found} value")]
    KindMismatch {
        type_handle: u32,
        field: u16,
        found: &'static str,
    },
}
