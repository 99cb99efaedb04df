//! Inbound payloads: forms and query strings.

use serde::Deserialize;
use uuid::Uuid;

use mailroom_entity::package::PackageStatus;
use mailroom_entity::user::Role;

/// POST /auth/login
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub csrf_token: String,
    #[serde(default)]
    pub next: Option<String>,
}

/// POST /auth/logout and other csrf-only forms
#[derive(Debug, Deserialize)]
pub struct CsrfForm {
    pub csrf_token: String,
}

/// POST /me/password and /me/force-password-change
#[derive(Debug, Deserialize)]
pub struct ChangePasswordForm {
    pub current_password: String,
    pub new_password: String,
    pub csrf_token: String,
}

/// GET /packages and /admin/reports/*
#[derive(Debug, Deserialize, Default)]
pub struct PackageListQuery {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub status: Option<PackageStatus>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub date_from: Option<String>,
    #[serde(default)]
    pub date_to: Option<String>,
    #[serde(default)]
    pub page: Option<u64>,
    #[serde(default)]
    pub limit: Option<u64>,
}

/// POST /packages/{id}/status
#[derive(Debug, Deserialize)]
pub struct StatusUpdateForm {
    pub status: PackageStatus,
    #[serde(default)]
    pub notes: Option<String>,
    pub csrf_token: String,
}

/// GET /recipients and /recipients/search
#[derive(Debug, Deserialize, Default)]
pub struct RecipientListQuery {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub page: Option<u64>,
    #[serde(default)]
    pub limit: Option<u64>,
}

/// POST /admin/users/new
#[derive(Debug, Deserialize)]
pub struct CreateUserForm {
    pub username: String,
    pub password: String,
    pub full_name: String,
    pub role: Role,
    pub csrf_token: String,
}

/// PUT /admin/users/{id}/edit
#[derive(Debug, Deserialize)]
pub struct UpdateUserForm {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
    pub csrf_token: String,
}

/// POST /admin/users/{id}/password
#[derive(Debug, Deserialize)]
pub struct ResetPasswordForm {
    pub new_password: String,
    pub csrf_token: String,
}

/// GET /admin/users
#[derive(Debug, Deserialize, Default)]
pub struct UserListQuery {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub page: Option<u64>,
    #[serde(default)]
    pub limit: Option<u64>,
}

/// POST /admin/recipients/new
#[derive(Debug, Deserialize)]
pub struct CreateRecipientForm {
    pub employee_id: String,
    pub name: String,
    pub email: String,
    pub department: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    pub csrf_token: String,
}

/// POST|PUT /admin/recipients/{id}/edit
#[derive(Debug, Deserialize)]
pub struct UpdateRecipientForm {
    pub name: String,
    pub email: String,
    pub department: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    pub csrf_token: String,
}

/// POST /admin/settings/qr-base-url
#[derive(Debug, Deserialize)]
pub struct QrBaseUrlForm {
    pub qr_base_url: String,
    pub csrf_token: String,
}

/// GET /admin/audit-logs
#[derive(Debug, Deserialize, Default)]
pub struct AuditLogQuery {
    #[serde(default)]
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub event_type: Option<String>,
    #[serde(default)]
    pub date_from: Option<String>,
    #[serde(default)]
    pub date_to: Option<String>,
    #[serde(default)]
    pub page: Option<u64>,
    #[serde(default)]
    pub limit: Option<u64>,
}
