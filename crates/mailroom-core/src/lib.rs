//! # mailroom-core
//!
//! Core crate for the mailroom tracking service. Contains the configuration
//! schema, the unified error system, and shared pagination/response types.
//!
//! This crate has **no** internal dependencies on other mailroom crates.

pub mod config;
pub mod error;
pub mod result;
pub mod types;

pub use config::AppConfig;
pub use error::AppError;
pub use result::AppResult;
