//! User entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::role::Role;

/// A registered user of the mailroom service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique user identifier.
    pub id: Uuid,
    /// Unique login name (case-sensitive, immutable after creation).
    pub username: String,
    /// Argon2id password digest with parameters embedded.
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Human-readable display name.
    pub full_name: String,
    /// Assigned role.
    pub role: Role,
    /// Whether the account may log in.
    pub is_active: bool,
    /// Whether the next login must change the password before anything else.
    pub must_change_password: bool,
    /// JSON array of previous password digests, oldest first.
    #[serde(skip_serializing)]
    pub password_history: Option<String>,
    /// Consecutive failed login attempts.
    pub failed_login_count: u32,
    /// Account locked until this time, if locked.
    pub locked_until: Option<DateTime<Utc>>,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Check whether the account is locked at the given instant.
    pub fn is_locked_at(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| until > now)
    }

    /// Public view without credential material.
    pub fn to_public(&self) -> UserPublic {
        UserPublic {
            id: self.id,
            username: self.username.clone(),
            full_name: self.full_name.clone(),
            role: self.role,
            is_active: self.is_active,
            must_change_password: self.must_change_password,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// User projection safe to expose over the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPublic {
    pub id: Uuid,
    pub username: String,
    pub full_name: String,
    pub role: Role,
    pub is_active: bool,
    pub must_change_password: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Data required to create a new user.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUser {
    /// Desired username.
    pub username: String,
    /// Initial plaintext password (validated and hashed by the service).
    pub password: String,
    /// Display name.
    pub full_name: String,
    /// Assigned role.
    pub role: Role,
}
