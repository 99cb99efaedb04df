//! Audit log handlers. Super admin only.

use std::str::FromStr;

use axum::Json;
use axum::extract::{Query, State};

use mailroom_auth::rbac::Permission;
use mailroom_core::error::AppError;
use mailroom_core::types::pagination::{PageRequest, PageResponse};
use mailroom_entity::audit::{AuthEvent, AuthEventKind};

use crate::dto::request::AuditLogQuery;
use crate::dto::{parse_date_from, parse_date_to};
use crate::extractors::CurrentUser;
use crate::state::AppState;

/// GET /admin/audit-logs
pub async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<AuditLogQuery>,
) -> Result<Json<PageResponse<AuthEvent>>, AppError> {
    state
        .policy
        .require(user.role(), Permission::ViewAuditLogs)?;

    let event_type = query
        .event_type
        .as_deref()
        .filter(|raw| !raw.trim().is_empty())
        .map(|raw| {
            AuthEventKind::from_str(raw.trim())
                .map_err(|_| AppError::validation(format!("Unknown event type '{raw}'")))
        })
        .transpose()?;

    let page = PageRequest::new(query.page.unwrap_or(1), query.limit.unwrap_or(50));
    let events = state
        .audit_logs
        .search(
            query.user_id,
            event_type,
            parse_date_from(query.date_from.as_deref())?,
            parse_date_to(query.date_to.as_deref())?,
            page,
        )
        .await?;
    Ok(Json(events))
}
