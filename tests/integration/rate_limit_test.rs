//! Rate limiting at the HTTP boundary.

use axum::body::Body;
use http::header::ACCEPT;
use http::{Request, StatusCode};

use crate::helpers::TestApp;

#[tokio::test]
async fn login_bucket_sheds_at_the_limit_with_retry_after() {
    let app = TestApp::with_config(|config| {
        config.rate_limit_login = 3;
    });

    // Exactly the limit fits in the window…
    for i in 0..3 {
        let response = app.get("/auth/login", None).await;
        assert_eq!(response.status, StatusCode::OK, "request {i}");
    }

    // …the next request is shed.
    let shed = app.get("/auth/login", None).await;
    assert_eq!(shed.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        shed.headers
            .get(http::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok()),
        Some("60")
    );
}

#[tokio::test]
async fn login_and_api_buckets_are_independent() {
    let app = TestApp::with_config(|config| {
        config.rate_limit_login = 1;
        config.rate_limit_api = 100;
    });

    assert_eq!(app.get("/auth/login", None).await.status, StatusCode::OK);
    assert_eq!(
        app.get("/auth/login", None).await.status,
        StatusCode::TOO_MANY_REQUESTS
    );

    // The api bucket still serves the same client.
    let api = app.get("/", None).await;
    assert_ne!(api.status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn health_is_exempt() {
    let app = TestApp::with_config(|config| {
        config.rate_limit_api = 1;
    });

    for _ in 0..5 {
        let response = app
            .send(
                Request::builder()
                    .method("GET")
                    .uri("/health")
                    .header(ACCEPT, "application/json")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK);
    }
}

#[tokio::test]
async fn clients_are_limited_separately_by_forwarded_ip() {
    let app = TestApp::with_config(|config| {
        config.rate_limit_login = 1;
    });

    let first = app
        .send(
            Request::builder()
                .method("GET")
                .uri("/auth/login")
                .header("x-forwarded-for", "10.0.0.1")
                .header(ACCEPT, "application/json")
                .body(Body::empty())
                .expect("request"),
        )
        .await;
    assert_eq!(first.status, StatusCode::OK);

    let same_ip = app
        .send(
            Request::builder()
                .method("GET")
                .uri("/auth/login")
                .header("x-forwarded-for", "10.0.0.1")
                .header(ACCEPT, "application/json")
                .body(Body::empty())
                .expect("request"),
        )
        .await;
    assert_eq!(same_ip.status, StatusCode::TOO_MANY_REQUESTS);

    let other_ip = app
        .send(
            Request::builder()
                .method("GET")
                .uri("/auth/login")
                .header("x-forwarded-for", "10.0.0.2")
                .header(ACCEPT, "application/json")
                .body(Body::empty())
                .expect("request"),
        )
        .await;
    assert_eq!(other_ip.status, StatusCode::OK);
}
