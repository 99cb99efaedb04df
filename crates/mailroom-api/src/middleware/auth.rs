//! Authentication binding middleware.
//!
//! Validates the session cookie and attaches a [`RequestContext`] to the
//! request. Unauthenticated requests to protected paths get a login
//! redirect (HTML) or 401 (JSON); a user flagged `must_change_password`
//! is confined to the forced-change endpoint and logout.

use axum::extract::{Request, State};
use axum::http::header::ACCEPT;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use tracing::debug;

use mailroom_core::error::AppError;
use mailroom_service::context::RequestContext;

use crate::cookies::{SESSION_COOKIE, get_cookie};
use crate::state::AppState;

/// Exact paths reachable without a session.
const PUBLIC_ROUTES: &[&str] = &[
    "/",
    "/auth/login",
    "/auth/logout",
    "/health",
    "/docs",
    "/redoc",
    "/openapi.json",
];

/// Path prefixes reachable without a session.
const PUBLIC_PREFIXES: &[&str] = &["/static/", "/uploads/", "/favicon.ico"];

/// The only paths a must-change-password user may reach.
const FORCE_CHANGE_PATH: &str = "/me/force-password-change";

pub async fn authentication_binding(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    if is_public(&path) {
        return next.run(request).await;
    }

    let Some(token) = get_cookie(request.headers(), SESSION_COOKIE) else {
        debug!(path = %path, "No session token; treating as unauthenticated");
        return unauthenticated_response(&request, &path);
    };

    let validated = match state.sessions.validate(&token).await {
        Ok(validated) => validated,
        Err(e) => return e.into_response(),
    };
    let Some((session, user)) = validated else {
        debug!(path = %path, "Invalid or expired session token");
        return unauthenticated_response(&request, &path);
    };

    if user.must_change_password && !path.starts_with(FORCE_CHANGE_PATH) {
        debug!(user = %user.username, "Password change required; confining navigation");
        if wants_json(&request) {
            return AppError::forbidden("Password change required").into_response();
        }
        return Redirect::temporary(FORCE_CHANGE_PATH).into_response();
    }

    let ip_address = client_ip(&request);
    let user_agent = request
        .headers()
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .map(String::from);

    request.extensions_mut().insert(RequestContext {
        user,
        session,
        ip_address,
        user_agent,
    });

    next.run(request).await
}

/// Client IP: first hop of `X-Forwarded-For` when present (the service
/// sits behind a reverse proxy), else unknown.
pub fn client_ip(request: &Request) -> Option<String> {
    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
}

fn is_public(path: &str) -> bool {
    PUBLIC_ROUTES.contains(&path) || PUBLIC_PREFIXES.iter().any(|p| path.starts_with(p))
}

fn wants_json(request: &Request) -> bool {
    request
        .headers()
        .get(ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("application/json"))
}

fn unauthenticated_response(request: &Request, path: &str) -> Response {
    if wants_json(request) {
        return AppError::unauthenticated("Authentication required").into_response();
    }
    let next_url = match request.uri().query() {
        Some(query) => format!("{path}?{query}"),
        None => path.to_string(),
    };
    let login_url = format!("/auth/login?next={}", urlencode(&next_url));
    Redirect::temporary(&login_url).into_response()
}

/// Minimal percent-encoding for the `next` query value.
fn urlencode(raw: &str) -> String {
    let mut encoded = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                encoded.push(byte as char)
            }
            other => encoded.push_str(&format!("%{other:02X}")),
        }
    }
    encoded
}
