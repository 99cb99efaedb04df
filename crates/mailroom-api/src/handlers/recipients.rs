//! Recipient read handlers for all roles (the management surface lives
//! under /admin).

use axum::Json;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::http::header::ACCEPT;
use axum::response::{Html, IntoResponse, Response};

use mailroom_core::error::AppError;
use mailroom_core::types::pagination::{PageRequest, PageResponse};
use mailroom_entity::recipient::Recipient;

use crate::dto::request::RecipientListQuery;
use crate::extractors::CurrentUser;
use crate::state::AppState;

/// GET /recipients — active directory listing.
pub async fn list(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(query): Query<RecipientListQuery>,
) -> Result<Json<PageResponse<Recipient>>, AppError> {
    let page = PageRequest::new(query.page.unwrap_or(1), query.limit.unwrap_or(25));
    Ok(Json(
        state
            .recipient_service
            .search(query.q, query.department, true, page)
            .await?,
    ))
}

/// GET /recipients/search — content-negotiated picker: a JSON array for
/// `Accept: application/json`, otherwise a small HTML partial for the
/// form widget.
pub async fn search(
    State(state): State<AppState>,
    _user: CurrentUser,
    headers: HeaderMap,
    Query(query): Query<RecipientListQuery>,
) -> Result<Response, AppError> {
    let page = PageRequest::new(1, query.limit.unwrap_or(20));
    let results = state
        .recipient_service
        .search(query.q, None, true, page)
        .await?;

    let wants_json = headers
        .get(ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("application/json"));

    if wants_json {
        return Ok(Json(results.items).into_response());
    }

    let mut html = String::from("<ul class=\"recipient-results\">");
    for recipient in &results.items {
        html.push_str(&format!(
            "<li data-id=\"{}\">{} — {}</li>",
            recipient.id,
            escape(&recipient.name),
            escape(&recipient.department),
        ));
    }
    html.push_str("</ul>");
    Ok(Html(html).into_response())
}

fn escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
