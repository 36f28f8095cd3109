//! Relationships Module - association descriptors and include specifications

pub mod includes;
pub mod metadata;

pub use includes::*;
pub use metadata::*;
