//! Auth handlers: login page/action, logout, identity.

use axum::Json;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::http::header::SET_COOKIE;
use axum::response::{IntoResponse, Redirect, Response};
use serde::Deserialize;

use mailroom_core::error::AppError;

use crate::cookies::{SESSION_COOKIE, clear_session_cookie, get_cookie, session_cookie};
use crate::dto::request::{CsrfForm, LoginForm};
use crate::dto::response::{FormPage, LoginResponse, UserIdentity};
use crate::extractors::{Csrf, CurrentUser};
use crate::state::AppState;

#[derive(Debug, Deserialize, Default)]
pub struct LoginPageQuery {
    #[serde(default)]
    pub next: Option<String>,
}

/// GET /auth/login — an already-authenticated browser is bounced to the
/// dashboard (or its `next` target); otherwise the page shell gets the
/// CSRF token its form must echo.
pub async fn login_page(
    State(state): State<AppState>,
    csrf: Csrf,
    Query(query): Query<LoginPageQuery>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    if let Some(token) = get_cookie(&headers, SESSION_COOKIE) {
        if state.sessions.validate(&token).await?.is_some() {
            let target = sanitize_next(query.next.as_deref()).unwrap_or("/dashboard");
            return Ok(Redirect::to(target).into_response());
        }
    }
    Ok(Json(FormPage {
        csrf_token: csrf.token().to_string(),
    })
    .into_response())
}

/// POST /auth/login — form-encoded; sets the session cookie on success.
pub async fn login(
    State(state): State<AppState>,
    csrf: Csrf,
    headers: HeaderMap,
    axum::Form(form): axum::Form<LoginForm>,
) -> Result<Response, AppError> {
    csrf.verify_form(&form.csrf_token)?;

    let ip = forwarded_ip(&headers);
    let user_agent = headers
        .get("user-agent")
        .and_then(|v| v.to_str().ok());

    let outcome = state
        .sessions
        .login(&form.username, &form.password, ip.as_deref(), user_agent)
        .await?;

    let redirect_url = if outcome.user.must_change_password {
        "/me/force-password-change".to_string()
    } else {
        sanitize_next(form.next.as_deref())
            .unwrap_or("/dashboard")
            .to_string()
    };

    let body = LoginResponse {
        success: true,
        message: "Login successful".to_string(),
        redirect_url,
        user: UserIdentity::from(&outcome.user),
    };

    let mut response = Json(body).into_response();
    let cookie = session_cookie(&outcome.session.token, state.config.is_production());
    response.headers_mut().append(
        SET_COOKIE,
        cookie
            .parse()
            .map_err(|_| AppError::internal("Invalid session cookie value"))?,
    );
    Ok(response)
}

/// POST /auth/logout — terminates the session (if any) and clears the
/// cookie. Works even with an expired session so a stale tab can always
/// leave.
pub async fn logout(
    State(state): State<AppState>,
    csrf: Csrf,
    headers: HeaderMap,
    axum::Form(form): axum::Form<CsrfForm>,
) -> Result<Response, AppError> {
    csrf.verify_form(&form.csrf_token)?;

    if let Some(token) = get_cookie(&headers, SESSION_COOKIE) {
        let ip = forwarded_ip(&headers);
        state.sessions.logout(&token, ip.as_deref()).await?;
    }

    // Redirect::to answers 303 See Other, the right code after a form POST.
    let mut response = Redirect::to("/auth/login").into_response();
    response.headers_mut().append(
        SET_COOKIE,
        clear_session_cookie()
            .parse()
            .map_err(|_| AppError::internal("Invalid session cookie value"))?,
    );
    Ok(response)
}

/// GET /auth/me — current identity.
pub async fn me(user: CurrentUser) -> Json<UserIdentity> {
    Json(UserIdentity::from(&user.user))
}

fn forwarded_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
}

/// Only same-origin relative paths are honored as post-login targets.
fn sanitize_next(next: Option<&str>) -> Option<&str> {
    next.filter(|n| n.starts_with('/') && !n.starts_with("//"))
}
