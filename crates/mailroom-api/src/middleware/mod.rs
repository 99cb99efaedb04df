//! The request pipeline, outermost first on the request path:
//! authentication binding → CSRF enforcement → rate limiting → security
//! headers → route handler. Responses pass back through in reverse.

pub mod auth;
pub mod csrf;
pub mod deadline;
pub mod rate_limit;
pub mod security_headers;
