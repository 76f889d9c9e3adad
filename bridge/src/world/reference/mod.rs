pub mod reference_resolver;
