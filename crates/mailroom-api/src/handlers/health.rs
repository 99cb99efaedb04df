//! Health check handler. Unauthenticated.

use axum::Json;
use axum::extract::State;

use mailroom_service::health::HealthStatus;

use crate::state::AppState;

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(
        state
            .health_service
            .status(env!("CARGO_PKG_VERSION"))
            .await,
    )
}
