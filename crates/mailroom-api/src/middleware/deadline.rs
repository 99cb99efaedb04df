//! Per-request handling deadline.
//!
//! On expiry the request answers 504; an in-flight write queue submission
//! still runs to completion on the worker, only its future is abandoned.

use std::time::Duration;

use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::warn;

/// Default request handling deadline.
const REQUEST_DEADLINE: Duration = Duration::from_secs(30);

pub async fn request_deadline(request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    match tokio::time::timeout(REQUEST_DEADLINE, next.run(request)).await {
        Ok(response) => response,
        Err(_) => {
            warn!(path = %path, "Request exceeded handling deadline");
            (StatusCode::GATEWAY_TIMEOUT, "Request timed out").into_response()
        }
    }
}
