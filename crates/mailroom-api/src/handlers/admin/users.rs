//! Admin user management handlers.
//!
//! The route guard requires the operator-management permission (the
//! minimum for this surface); finer rules (admins manage operators only,
//! role changes are super-admin-only, self-protection) live in the
//! service.

use axum::Json;
use axum::extract::{Path, Query, State};
use uuid::Uuid;

use mailroom_auth::rbac::Permission;
use mailroom_core::error::AppError;
use mailroom_core::types::pagination::{PageRequest, PageResponse};
use mailroom_core::types::response::MessageResponse;
use mailroom_entity::user::{CreateUser, UserPublic};

use crate::dto::request::{
    CreateUserForm, CsrfForm, ResetPasswordForm, UpdateUserForm, UserListQuery,
};
use crate::dto::response::FormPage;
use crate::extractors::{Csrf, CurrentUser};
use crate::state::AppState;

/// GET /admin/users
pub async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<UserListQuery>,
) -> Result<Json<PageResponse<UserPublic>>, AppError> {
    state
        .policy
        .require(user.role(), Permission::ManageOperators)?;
    let page = PageRequest::new(query.page.unwrap_or(1), query.limit.unwrap_or(25));
    Ok(Json(
        state
            .user_service
            .search(query.q, query.role, query.is_active, page)
            .await?,
    ))
}

/// GET /admin/users/new
pub async fn new_page(
    State(state): State<AppState>,
    user: CurrentUser,
    csrf: Csrf,
) -> Result<Json<FormPage>, AppError> {
    state
        .policy
        .require(user.role(), Permission::ManageOperators)?;
    Ok(Json(FormPage {
        csrf_token: csrf.token().to_string(),
    }))
}

/// POST /admin/users/new
pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    csrf: Csrf,
    axum::Form(form): axum::Form<CreateUserForm>,
) -> Result<Json<UserPublic>, AppError> {
    state
        .policy
        .require(user.role(), Permission::ManageOperators)?;
    csrf.verify_form(&form.csrf_token)?;

    let created = state
        .user_service
        .create(
            CreateUser {
                username: form.username,
                password: form.password,
                full_name: form.full_name,
                role: form.role,
            },
            &user.user,
            user.ip(),
        )
        .await?;
    Ok(Json(created.to_public()))
}

/// GET /admin/users/{id}/edit
pub async fn edit_page(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<UserPublic>, AppError> {
    state
        .policy
        .require(user.role(), Permission::ManageOperators)?;
    let target = state
        .user_service
        .get(id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    state
        .policy
        .can_manage_user(user.role(), target.role)
        .into_result()?;
    Ok(Json(target.to_public()))
}

/// PUT /admin/users/{id}/edit
pub async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    csrf: Csrf,
    Path(id): Path<Uuid>,
    axum::Form(form): axum::Form<UpdateUserForm>,
) -> Result<Json<UserPublic>, AppError> {
    state
        .policy
        .require(user.role(), Permission::ManageOperators)?;
    csrf.verify_form(&form.csrf_token)?;

    let updated = state
        .user_service
        .update(id, form.full_name, form.role, &user.user, user.ip())
        .await?;
    Ok(Json(updated.to_public()))
}

/// POST /admin/users/{id}/deactivate
pub async fn deactivate(
    State(state): State<AppState>,
    user: CurrentUser,
    csrf: Csrf,
    Path(id): Path<Uuid>,
    axum::Form(form): axum::Form<CsrfForm>,
) -> Result<Json<MessageResponse>, AppError> {
    state
        .policy
        .require(user.role(), Permission::ManageOperators)?;
    csrf.verify_form(&form.csrf_token)?;

    state
        .user_service
        .deactivate(id, &user.user, user.ip())
        .await?;
    Ok(Json(MessageResponse {
        message: "User deactivated".to_string(),
    }))
}

/// POST /admin/users/{id}/password — admin password reset; forces a
/// change on the target's next login and ends their sessions.
pub async fn reset_password(
    State(state): State<AppState>,
    user: CurrentUser,
    csrf: Csrf,
    Path(id): Path<Uuid>,
    axum::Form(form): axum::Form<ResetPasswordForm>,
) -> Result<Json<MessageResponse>, AppError> {
    state
        .policy
        .require(user.role(), Permission::ManageOperators)?;
    csrf.verify_form(&form.csrf_token)?;

    state
        .user_service
        .reset_password(id, &form.new_password, &user.user, user.ip())
        .await?;
    Ok(Json(MessageResponse {
        message: "Password reset; the user must choose a new password at next login".to_string(),
    }))
}
