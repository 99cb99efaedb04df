//! # mailroom-api
//!
//! HTTP surface of the mailroom tracking service: application state,
//! the middleware pipeline (authentication binding, CSRF, rate limiting,
//! security headers), route handlers, and the server runner.

pub mod cookies;
pub mod dto;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;
pub mod state;

pub use router::build_router;
pub use state::AppState;
