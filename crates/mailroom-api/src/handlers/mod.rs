//! HTTP route handlers, organized by surface.

pub mod admin;
pub mod auth;
pub mod dashboard;
pub mod health;
pub mod me;
pub mod packages;
pub mod recipients;
