//! Common numeric and identifier types

pub mod errors;
pub mod fixed_point;
pub mod identifiers;
pub mod quote;
