//! Cookie construction and parsing for the session and CSRF cookies.
//!
//! The session cookie is `HttpOnly; SameSite=Lax`, `Secure` only in
//! production, and browser-session scoped: server-side expiry is
//! authoritative. The CSRF cookie is `SameSite=Strict` and readable by
//! the page so request headers can echo it.

use axum::http::HeaderMap;
use axum::http::header::COOKIE;
use cookie::time::Duration;
use cookie::{Cookie, SameSite};

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "session_token";
/// Name of the CSRF cookie.
pub const CSRF_COOKIE: &str = "csrf_token";

/// Read a named cookie from the request headers.
pub fn get_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let raw = headers.get(COOKIE)?.to_str().ok()?;
    for cookie in Cookie::split_parse(raw.to_owned()).flatten() {
        if cookie.name() == name {
            return Some(cookie.value().to_string());
        }
    }
    None
}

/// Build the session cookie `Set-Cookie` value.
pub fn session_cookie(token: &str, secure: bool) -> String {
    Cookie::build((SESSION_COOKIE, token.to_owned()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
        .to_string()
}

/// Build a `Set-Cookie` value that clears the session cookie.
pub fn clear_session_cookie() -> String {
    Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(Duration::ZERO)
        .build()
        .to_string()
}

/// Build the CSRF cookie `Set-Cookie` value. Not `HttpOnly`: client-side
/// code must read it to echo the `X-CSRF-Token` header.
pub fn csrf_cookie(token: &str, secure: bool) -> String {
    Cookie::build((CSRF_COOKIE, token.to_owned()))
        .path("/")
        .http_only(false)
        .same_site(SameSite::Strict)
        .secure(secure)
        .build()
        .to_string()
}
