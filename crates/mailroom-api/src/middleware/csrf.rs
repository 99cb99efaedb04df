//! CSRF enforcement middleware.
//!
//! Double-submit model: a non-HttpOnly `SameSite=Strict` cookie carries
//! the token; unsafe requests must echo it in the `X-CSRF-Token` header or
//! in a form field the handler validates via [`CsrfGuard::verify_form`].
//! Comparisons are constant-time.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::extract::{Request, State};
use axum::http::Method;
use axum::http::header::SET_COOKIE;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use subtle::ConstantTimeEq;

use mailroom_auth::session::generate_token;
use mailroom_core::error::AppError;

use crate::cookies::{CSRF_COOKIE, csrf_cookie, get_cookie};
use crate::state::AppState;

/// Exact paths exempt from CSRF validation.
const EXEMPT_ROUTES: &[&str] = &["/health"];

/// Path prefixes exempt from CSRF validation.
const EXEMPT_PREFIXES: &[&str] = &["/static/", "/uploads/", "/docs", "/redoc", "/openapi.json"];

/// Per-request CSRF expectation, published to handlers through request
/// extensions. Handlers receiving form bodies call [`Self::verify_form`];
/// the middleware rejects the response afterwards if a required form
/// validation never happened.
#[derive(Clone)]
pub struct CsrfGuard {
    expected: String,
    requires_form_validation: bool,
    form_validated: Arc<AtomicBool>,
}

impl CsrfGuard {
    fn new(expected: String, requires_form_validation: bool) -> Self {
        Self {
            expected,
            requires_form_validation,
            form_validated: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The token the client is expected to echo.
    pub fn token(&self) -> &str {
        &self.expected
    }

    /// Validate a form-submitted token against the cookie value.
    pub fn verify_form(&self, form_token: &str) -> Result<(), AppError> {
        if constant_time_eq(&self.expected, form_token) {
            self.form_validated.store(true, Ordering::Release);
            Ok(())
        } else {
            Err(AppError::forbidden("CSRF token validation failed"))
        }
    }

    fn is_satisfied(&self) -> bool {
        !self.requires_form_validation || self.form_validated.load(Ordering::Acquire)
    }
}

pub async fn csrf_enforcement(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    if is_exempt(&path) {
        return next.run(request).await;
    }

    let cookie_token = get_cookie(request.headers(), CSRF_COOKIE);
    let secure = state.config.is_production();

    if !is_protected_method(request.method()) {
        // Safe request: make sure a token exists and keep the cookie fresh.
        let token = cookie_token.unwrap_or_else(generate_token);
        request
            .extensions_mut()
            .insert(CsrfGuard::new(token.clone(), false));
        let mut response = next.run(request).await;
        set_csrf_cookie(&mut response, &token, secure);
        return response;
    }

    // Protected method: the cookie must be present, full stop.
    let Some(cookie_token) = cookie_token else {
        return AppError::forbidden("CSRF token validation failed").into_response();
    };

    let header_token = request
        .headers()
        .get("x-csrf-token")
        .and_then(|v| v.to_str().ok())
        .map(String::from);

    let guard = match header_token {
        Some(header_token) => {
            if !constant_time_eq(&cookie_token, &header_token) {
                return AppError::forbidden("CSRF token validation failed").into_response();
            }
            CsrfGuard::new(cookie_token.clone(), false)
        }
        // No header: the handler must validate a form field against the
        // expectation published here.
        None => CsrfGuard::new(cookie_token.clone(), true),
    };

    request.extensions_mut().insert(guard.clone());
    let mut response = next.run(request).await;

    if !guard.is_satisfied() {
        return AppError::forbidden("CSRF form token was not validated").into_response();
    }

    set_csrf_cookie(&mut response, &cookie_token, secure);
    response
}

fn set_csrf_cookie(response: &mut Response, token: &str, secure: bool) {
    if let Ok(value) = csrf_cookie(token, secure).parse() {
        response.headers_mut().append(SET_COOKIE, value);
    }
}

fn is_protected_method(method: &Method) -> bool {
    *method == Method::POST
        || *method == Method::PUT
        || *method == Method::PATCH
        || *method == Method::DELETE
}

fn is_exempt(path: &str) -> bool {
    EXEMPT_ROUTES.contains(&path) || EXEMPT_PREFIXES.iter().any(|p| path.starts_with(p))
}

/// Constant-time string comparison, padded so mismatched lengths do not
/// short-circuit.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    let max_len = a.len().max(b.len());
    let mut a_padded = vec![0u8; max_len];
    let mut b_padded = vec![0xFFu8; max_len];
    a_padded[..a.len()].copy_from_slice(a.as_bytes());
    b_padded[..b.len()].copy_from_slice(b.as_bytes());

    let lengths_equal = a.len().ct_eq(&b.len());
    let contents_equal = a_padded.ct_eq(&b_padded);
    (lengths_equal & contents_equal).into()
}
