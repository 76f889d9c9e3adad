pub mod binding;
pub mod channel;
pub mod component;
pub mod object;
pub mod reference;
