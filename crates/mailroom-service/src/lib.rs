//! # mailroom-service
//!
//! Business services for the mailroom tracking service: the package
//! lifecycle core, recipient directory with bulk import, user
//! administration, system settings, upload validation, and the read
//! projections (dashboard, reports, health).

pub mod context;
pub mod dashboard;
pub mod health;
pub mod package;
pub mod recipient;
pub mod report;
pub mod settings;
pub mod upload;
pub mod user;

pub use context::RequestContext;
