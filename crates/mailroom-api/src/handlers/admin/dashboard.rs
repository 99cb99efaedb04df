//! Admin dashboard summary.

use axum::Json;
use axum::extract::State;

use mailroom_auth::rbac::Permission;
use mailroom_core::error::AppError;
use mailroom_service::dashboard::DashboardSummary;

use crate::extractors::CurrentUser;
use crate::state::AppState;

/// GET /admin/dashboard
pub async fn summary(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<DashboardSummary>, AppError> {
    state.policy.require(user.role(), Permission::ViewReports)?;
    Ok(Json(state.dashboard_service.summary().await?))
}
