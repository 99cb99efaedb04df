//! System settings handlers. Super admin only.

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use mailroom_auth::rbac::Permission;
use mailroom_core::error::AppError;

use crate::dto::request::QrBaseUrlForm;
use crate::extractors::{Csrf, CurrentUser};
use crate::state::AppState;

/// Current settings snapshot.
#[derive(Debug, Serialize)]
pub struct SettingsView {
    pub qr_base_url: Option<String>,
    pub csrf_token: String,
}

/// GET /admin/settings
pub async fn show(
    State(state): State<AppState>,
    user: CurrentUser,
    csrf: Csrf,
) -> Result<Json<SettingsView>, AppError> {
    state.policy.require(user.role(), Permission::EditSettings)?;
    Ok(Json(SettingsView {
        qr_base_url: state.settings_service.qr_base_url().await?,
        csrf_token: csrf.token().to_string(),
    }))
}

/// POST /admin/settings/qr-base-url — set the external base URL used in
/// sticker deep links. Validated and normalized; the write and its audit
/// record land in one batch.
pub async fn set_qr_base_url(
    State(state): State<AppState>,
    user: CurrentUser,
    csrf: Csrf,
    axum::Form(form): axum::Form<QrBaseUrlForm>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.policy.require(user.role(), Permission::EditSettings)?;
    csrf.verify_form(&form.csrf_token)?;

    let normalized = state
        .settings_service
        .set_qr_base_url(&form.qr_base_url, &user.user, user.ip())
        .await?;
    Ok(Json(serde_json::json!({ "qr_base_url": normalized })))
}
