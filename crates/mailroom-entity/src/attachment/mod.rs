//! Attachment entity.

pub mod model;

pub use model::Attachment;
