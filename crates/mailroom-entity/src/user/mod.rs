//! User entity: model and role.

pub mod model;
pub mod role;

pub use model::{CreateUser, User, UserPublic};
pub use role::Role;
