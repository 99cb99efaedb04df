//! Self-service handlers: password changes, profile, sessions.

use axum::Json;
use axum::extract::{Path, State};
use uuid::Uuid;

use mailroom_core::error::AppError;
use mailroom_core::types::response::MessageResponse;

use crate::dto::request::{ChangePasswordForm, CsrfForm};
use crate::dto::response::{FormPage, SessionInfo, UserIdentity};
use crate::extractors::{Csrf, CurrentUser};
use crate::state::AppState;

/// GET /me/password and /me/force-password-change — the page shell with
/// the CSRF token the form must echo.
pub async fn password_page(_user: CurrentUser, csrf: Csrf) -> Json<FormPage> {
    Json(FormPage {
        csrf_token: csrf.token().to_string(),
    })
}

/// POST /me/password — self-service password change.
pub async fn change_password(
    State(state): State<AppState>,
    user: CurrentUser,
    csrf: Csrf,
    axum::Form(form): axum::Form<ChangePasswordForm>,
) -> Result<Json<MessageResponse>, AppError> {
    csrf.verify_form(&form.csrf_token)?;
    state
        .user_service
        .change_own_password(
            &user.user,
            &form.current_password,
            &form.new_password,
            user.ip(),
        )
        .await?;
    Ok(Json(MessageResponse {
        message: "Password changed successfully".to_string(),
    }))
}

/// POST /me/force-password-change — identical change flow; completing it
/// clears the forced-change flag and unlocks navigation.
pub async fn force_change_password(
    state: State<AppState>,
    user: CurrentUser,
    csrf: Csrf,
    form: axum::Form<ChangePasswordForm>,
) -> Result<Json<MessageResponse>, AppError> {
    change_password(state, user, csrf, form).await
}

/// GET /me/profile
pub async fn profile(user: CurrentUser) -> Json<UserIdentity> {
    Json(UserIdentity::from(&user.user))
}

/// GET /me/sessions — the caller's active sessions, most recent first.
pub async fn list_sessions(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<SessionInfo>>, AppError> {
    let sessions = state.sessions.sessions_for_user(user.user_id()).await?;
    let current_id = user.session.id;
    Ok(Json(
        sessions
            .into_iter()
            .map(|s| SessionInfo {
                id: s.id,
                created_at: s.created_at,
                last_activity: s.last_activity,
                expires_at: s.expires_at,
                ip_address: s.ip_address,
                user_agent: s.user_agent,
                current: s.id == current_id,
            })
            .collect(),
    ))
}

/// POST /me/sessions/{id}/terminate — terminate one of the caller's own
/// sessions. Foreign ids terminate nothing and answer 404.
pub async fn terminate_session(
    State(state): State<AppState>,
    user: CurrentUser,
    csrf: Csrf,
    Path(session_id): Path<Uuid>,
    axum::Form(form): axum::Form<CsrfForm>,
) -> Result<Json<MessageResponse>, AppError> {
    csrf.verify_form(&form.csrf_token)?;
    let deleted = state
        .sessions
        .terminate_session_by_id(session_id, user.user_id())
        .await?;
    if !deleted {
        return Err(AppError::not_found("Session not found"));
    }
    Ok(Json(MessageResponse {
        message: "Session terminated".to_string(),
    }))
}
