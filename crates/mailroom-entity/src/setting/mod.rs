//! System setting entity.

pub mod model;

pub use model::{QR_BASE_URL, Setting};
