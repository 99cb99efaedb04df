//! User administration and self-service.

pub mod service;

pub use service::UserService;
