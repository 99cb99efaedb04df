//! # mailroom-auth
//!
//! Identity and authorization for the mailroom tracking service: password
//! hashing and policy, session lifecycle with a concurrent-session cap, and
//! the pure role-based access policy.

pub mod password;
pub mod rbac;
pub mod session;

pub use password::{PasswordHasher, PasswordValidator};
pub use rbac::{AccessPolicy, Decision, Permission};
pub use session::SessionManager;
