//! Role-based access control: the permission catalog and the pure decision
//! module.

pub mod enforcer;
pub mod policies;

pub use enforcer::{AccessPolicy, Decision, DenyReason};
pub use policies::Permission;
