//! CSRF enforcement: cookie presence, header and form validation,
//! constant-time pairing.

use axum::body::Body;
use http::header::{ACCEPT, CONTENT_TYPE, COOKIE};
use http::{Request, StatusCode};

use mailroom_entity::user::Role;

use crate::helpers::{TestApp, form};

#[tokio::test]
async fn protected_request_without_csrf_cookie_is_refused() {
    let app = TestApp::new();
    app.seed_user("op", "Correct-Horse-9!", Role::Operator).await;
    let cookies = app.login("op", "Correct-Horse-9!").await;

    // Session cookie only — no csrf cookie at all.
    let body = form(&[
        ("status", "awaiting_pickup"),
        ("csrf_token", &cookies.csrf),
    ]);
    let response = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/packages/00000000-0000-0000-0000-000000000000/status")
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .header(COOKIE, format!("session_token={}", cookies.session))
                .header(ACCEPT, "application/json")
                .body(Body::from(body))
                .expect("request"),
        )
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn login_without_csrf_cookie_creates_nothing() {
    let app = TestApp::new();
    app.seed_user("jdoe", "Correct-Horse-9!", Role::Operator).await;

    let body = form(&[
        ("username", "jdoe"),
        ("password", "Correct-Horse-9!"),
        ("csrf_token", "whatever"),
    ]);
    let response = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/auth/login")
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .header(ACCEPT, "application/json")
                .body(Body::from(body))
                .expect("request"),
        )
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert!(response.cookie("session_token").is_none());
    assert_eq!(app.audit_count("login").await, 0);
}

#[tokio::test]
async fn mismatched_header_token_is_refused() {
    let app = TestApp::new();
    app.seed_user("op", "Correct-Horse-9!", Role::Operator).await;
    let cookies = app.login("op", "Correct-Horse-9!").await;

    let response = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/admin/recipients/import/validate")
                .header(CONTENT_TYPE, "application/json")
                .header(COOKIE, cookies.header())
                .header("X-CSRF-Token", "not-the-cookie-value")
                .header(ACCEPT, "application/json")
                .body(Body::from("[]"))
                .expect("request"),
        )
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn json_endpoints_require_the_header() {
    let app = TestApp::new();
    app.seed_user("boss", "Correct-Horse-9!", Role::Admin).await;
    let cookies = app.login("boss", "Correct-Horse-9!").await;

    // No header, no form: the middleware's post-check refuses.
    let missing = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/admin/recipients/import/validate")
                .header(CONTENT_TYPE, "application/json")
                .header(COOKIE, cookies.header())
                .header(ACCEPT, "application/json")
                .body(Body::from("[]"))
                .expect("request"),
        )
        .await;
    assert_eq!(missing.status, StatusCode::FORBIDDEN);

    // With the matching header the same request succeeds.
    let ok = app
        .post_json(
            "/admin/recipients/import/validate",
            &cookies,
            serde_json::json!([]),
        )
        .await;
    assert_eq!(ok.status, StatusCode::OK, "{:?}", ok.body);
}

#[tokio::test]
async fn wrong_form_token_is_refused() {
    let app = TestApp::new();
    app.seed_user("jdoe", "Correct-Horse-9!", Role::Operator).await;
    let csrf = app.csrf_token().await;

    let body = form(&[
        ("username", "jdoe"),
        ("password", "Correct-Horse-9!"),
        ("csrf_token", "forged-token"),
    ]);
    let response = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/auth/login")
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .header(COOKIE, format!("csrf_token={csrf}"))
                .header(ACCEPT, "application/json")
                .body(Body::from(body))
                .expect("request"),
        )
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert!(response.cookie("session_token").is_none());
}

#[tokio::test]
async fn safe_requests_receive_a_csrf_cookie() {
    let app = TestApp::new();
    let response = app.get("/auth/login", None).await;
    assert_eq!(response.status, StatusCode::OK);
    let token = response.cookie("csrf_token").expect("cookie issued");
    assert!(token.len() >= 22, "at least 128 bits encoded");

    let raw = response
        .headers
        .get_all(http::header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("csrf_token="))
        .expect("csrf set-cookie")
        .to_string();
    assert!(raw.contains("SameSite=Strict"));
    assert!(!raw.contains("HttpOnly"));
}

#[tokio::test]
async fn exempt_paths_skip_csrf() {
    let app = TestApp::new();
    let response = app.get("/health", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.cookie("csrf_token").is_none());
}
