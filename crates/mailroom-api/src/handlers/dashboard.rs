//! Dashboard handler.

use axum::Json;
use axum::extract::State;

use mailroom_core::error::AppError;
use mailroom_service::dashboard::DashboardSummary;

use crate::extractors::CurrentUser;
use crate::state::AppState;

/// GET /dashboard
pub async fn dashboard(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> Result<Json<DashboardSummary>, AppError> {
    Ok(Json(state.dashboard_service.summary().await?))
}
