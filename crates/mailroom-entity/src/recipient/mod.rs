//! Recipient entity.

pub mod model;

pub use model::{CreateRecipient, Recipient, UpdateRecipient};
