//! Package lifecycle core.

pub mod service;

pub use service::{PackageDetail, PackageService};
