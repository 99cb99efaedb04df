//! Report handlers: preview and CSV export.

use axum::Json;
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use mailroom_auth::rbac::Permission;
use mailroom_core::error::AppError;
use mailroom_database::repositories::package::{ExportRow, PackageFilters};
use mailroom_entity::package::PackageStatus;

use crate::dto::request::PackageListQuery;
use crate::dto::{parse_date_from, parse_date_to};
use crate::extractors::CurrentUser;
use crate::state::AppState;

/// Filter metadata for the report page.
#[derive(Debug, Serialize)]
pub struct ReportOptions {
    pub departments: Vec<String>,
    pub statuses: Vec<&'static str>,
}

/// GET /admin/reports — available filters.
pub async fn options(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<ReportOptions>, AppError> {
    state.policy.require(user.role(), Permission::ViewReports)?;
    Ok(Json(ReportOptions {
        departments: state.recipient_service.departments().await?,
        statuses: PackageStatus::all().iter().map(|s| s.as_str()).collect(),
    }))
}

/// GET /admin/reports/preview — filtered rows as JSON.
pub async fn preview(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<PackageListQuery>,
) -> Result<Json<Vec<ExportRow>>, AppError> {
    state.policy.require(user.role(), Permission::ViewReports)?;
    let filters = filters_from(&query)?;
    Ok(Json(state.report_service.preview(filters).await?))
}

/// GET /admin/reports/export — the same rows as a CSV attachment;
/// audited as `export_generated`.
pub async fn export(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<PackageListQuery>,
) -> Result<Response, AppError> {
    state
        .policy
        .require(user.role(), Permission::ExportReports)?;
    let filters = filters_from(&query)?;
    let csv = state
        .report_service
        .export_csv(filters, &user.user, user.ip())
        .await?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"packages-report.csv\"",
            ),
        ],
        csv,
    )
        .into_response())
}

fn filters_from(query: &PackageListQuery) -> Result<PackageFilters, AppError> {
    Ok(PackageFilters {
        query: query.q.clone().filter(|q| !q.trim().is_empty()),
        status: query.status,
        department: query.department.clone().filter(|d| !d.trim().is_empty()),
        date_from: parse_date_from(query.date_from.as_deref())?,
        date_to: parse_date_to(query.date_to.as_deref())?,
        recipient_id: None,
        created_by: None,
    })
}
