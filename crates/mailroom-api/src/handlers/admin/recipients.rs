//! Admin recipient management and bulk import handlers.

use axum::Json;
use axum::extract::{Path, Query, State};
use uuid::Uuid;

use mailroom_auth::rbac::Permission;
use mailroom_core::error::AppError;
use mailroom_core::types::pagination::{PageRequest, PageResponse};
use mailroom_core::types::response::MessageResponse;
use mailroom_entity::recipient::{CreateRecipient, Recipient, UpdateRecipient};
use mailroom_service::recipient::{ImportReport, ImportRow, ImportSummary};

use crate::dto::request::{
    CreateRecipientForm, CsrfForm, RecipientListQuery, UpdateRecipientForm,
};
use crate::dto::response::FormPage;
use crate::extractors::{Csrf, CurrentUser};
use crate::state::AppState;

/// GET /admin/recipients — full directory including deactivated entries.
pub async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<RecipientListQuery>,
) -> Result<Json<PageResponse<Recipient>>, AppError> {
    state
        .policy
        .require(user.role(), Permission::ManageRecipients)?;
    let page = PageRequest::new(query.page.unwrap_or(1), query.limit.unwrap_or(25));
    Ok(Json(
        state
            .recipient_service
            .search(query.q, query.department, false, page)
            .await?,
    ))
}

/// GET /admin/recipients/new
pub async fn new_page(
    State(state): State<AppState>,
    user: CurrentUser,
    csrf: Csrf,
) -> Result<Json<FormPage>, AppError> {
    state
        .policy
        .require(user.role(), Permission::ManageRecipients)?;
    Ok(Json(FormPage {
        csrf_token: csrf.token().to_string(),
    }))
}

/// POST /admin/recipients/new
pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    csrf: Csrf,
    axum::Form(form): axum::Form<CreateRecipientForm>,
) -> Result<Json<Recipient>, AppError> {
    state
        .policy
        .require(user.role(), Permission::ManageRecipients)?;
    csrf.verify_form(&form.csrf_token)?;

    let recipient = state
        .recipient_service
        .create(
            CreateRecipient {
                employee_id: form.employee_id,
                name: form.name,
                email: form.email,
                department: form.department,
                phone: form.phone,
                location: form.location,
            },
            &user.user,
            user.ip(),
        )
        .await?;
    Ok(Json(recipient))
}

/// GET /admin/recipients/{id}/edit
pub async fn edit_page(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Recipient>, AppError> {
    state
        .policy
        .require(user.role(), Permission::ManageRecipients)?;
    state
        .recipient_service
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Recipient not found"))
}

/// POST|PUT /admin/recipients/{id}/edit
pub async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    csrf: Csrf,
    Path(id): Path<Uuid>,
    axum::Form(form): axum::Form<UpdateRecipientForm>,
) -> Result<Json<Recipient>, AppError> {
    state
        .policy
        .require(user.role(), Permission::ManageRecipients)?;
    csrf.verify_form(&form.csrf_token)?;

    let recipient = state
        .recipient_service
        .update(
            id,
            UpdateRecipient {
                name: form.name,
                email: form.email,
                department: form.department,
                phone: form.phone,
                location: form.location,
            },
            &user.user,
            user.ip(),
        )
        .await?;
    Ok(Json(recipient))
}

/// POST /admin/recipients/{id}/deactivate — refused while the recipient
/// has packages in a non-terminal state.
pub async fn deactivate(
    State(state): State<AppState>,
    user: CurrentUser,
    csrf: Csrf,
    Path(id): Path<Uuid>,
    axum::Form(form): axum::Form<CsrfForm>,
) -> Result<Json<MessageResponse>, AppError> {
    state
        .policy
        .require(user.role(), Permission::ManageRecipients)?;
    csrf.verify_form(&form.csrf_token)?;

    state
        .recipient_service
        .deactivate(id, &user.user, user.ip())
        .await?;
    Ok(Json(MessageResponse {
        message: "Recipient deactivated".to_string(),
    }))
}

/// GET /admin/recipients/import
pub async fn import_page(
    State(state): State<AppState>,
    user: CurrentUser,
    csrf: Csrf,
) -> Result<Json<FormPage>, AppError> {
    state
        .policy
        .require(user.role(), Permission::ImportRecipients)?;
    Ok(Json(FormPage {
        csrf_token: csrf.token().to_string(),
    }))
}

/// POST /admin/recipients/import/validate — dry-run report over parsed
/// rows; writes nothing. CSV parsing happens client-side/upstream.
pub async fn import_validate(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(rows): Json<Vec<ImportRow>>,
) -> Result<Json<Vec<ImportReport>>, AppError> {
    state
        .policy
        .require(user.role(), Permission::ImportRecipients)?;
    Ok(Json(state.recipient_importer.validate_rows(&rows).await?))
}

/// POST /admin/recipients/import/confirm — apply rows (upsert by
/// employee id) in chunked transactions and report a summary.
pub async fn import_confirm(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(rows): Json<Vec<ImportRow>>,
) -> Result<Json<ImportSummary>, AppError> {
    state
        .policy
        .require(user.role(), Permission::ImportRecipients)?;
    Ok(Json(
        state
            .recipient_importer
            .apply_rows(rows, &user.user, user.ip())
            .await?,
    ))
}
