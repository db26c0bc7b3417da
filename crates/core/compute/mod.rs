//! Spatial indexing and input validation.

pub mod spatial;
pub mod validation;
