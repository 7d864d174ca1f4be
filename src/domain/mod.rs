//! Domain layer types and invariants.

pub mod entities;
pub mod relations;
pub mod slug;
pub mod viewer;
