//! Outbound payloads.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use mailroom_entity::user::{Role, User};

/// The identity block returned by login and `/auth/me`.
#[derive(Debug, Clone, Serialize)]
pub struct UserIdentity {
    pub id: Uuid,
    pub username: String,
    pub full_name: String,
    pub role: Role,
    pub must_change_password: bool,
}

impl From<&User> for UserIdentity {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            full_name: user.full_name.clone(),
            role: user.role,
            must_change_password: user.must_change_password,
        }
    }
}

/// POST /auth/login success payload.
#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
    pub redirect_url: String,
    pub user: UserIdentity,
}

/// GET form pages: the CSRF token the form must echo.
#[derive(Debug, Clone, Serialize)]
pub struct FormPage {
    pub csrf_token: String,
}

/// One row of the self-service session list. The raw token is never
/// exposed.
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    /// Whether this row is the session making the request.
    pub current: bool,
}

/// Package deep-link payload for the sticker endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct PackageLink {
    pub package_id: Uuid,
    pub tracking_no: String,
    pub url: String,
}
