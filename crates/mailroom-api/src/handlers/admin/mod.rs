//! Admin-surface handlers. Every handler guards through the access
//! policy before touching a service.

pub mod audit;
pub mod dashboard;
pub mod recipients;
pub mod reports;
pub mod settings;
pub mod users;
