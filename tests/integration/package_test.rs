//! Package lifecycle: registration, transitions, the event log, photos,
//! and search.

use axum::body::Body;
use http::header::{ACCEPT, CONTENT_TYPE, COOKIE};
use http::{Request, StatusCode};
use serde_json::Value;

use mailroom_entity::recipient::CreateRecipient;
use mailroom_entity::user::Role;

use crate::helpers::{AuthCookies, TestApp};

async fn seed_recipient(app: &TestApp, employee_id: &str, email: &str) -> String {
    let admin = app
        .seed_user(&format!("admin-{employee_id}"), "Correct-Horse-9!", Role::Admin)
        .await;
    let recipient = app
        .state
        .recipient_service
        .create(
            CreateRecipient {
                employee_id: employee_id.to_string(),
                name: "Pat Example".to_string(),
                email: email.to_string(),
                department: "Finance".to_string(),
                phone: None,
                location: None,
            },
            &admin,
            None,
        )
        .await
        .expect("create recipient");
    recipient.id.to_string()
}

async fn register_package(
    app: &TestApp,
    cookies: &AuthCookies,
    tracking_no: &str,
    recipient_id: &str,
) -> Value {
    // The registration endpoint takes multipart; assemble a minimal
    // payload by hand.
    let boundary = "test-boundary-7d9f";
    let mut multipart = String::new();
    for (name, value) in [
        ("tracking_no", tracking_no),
        ("carrier", "UPS"),
        ("recipient_id", recipient_id),
        ("csrf_token", cookies.csrf.as_str()),
    ] {
        multipart.push_str(&format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
        ));
    }
    multipart.push_str(&format!("--{boundary}--\r\n"));

    let response = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/packages/new")
                .header(
                    CONTENT_TYPE,
                    format!("multipart/form-data; boundary={boundary}"),
                )
                .header(COOKIE, cookies.header())
                .header(ACCEPT, "application/json")
                .body(Body::from(multipart))
                .expect("request"),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
    response.body
}

#[tokio::test]
async fn registration_creates_the_package_its_event_and_the_audit_record() {
    let app = TestApp::new();
    app.seed_user("op", "Correct-Horse-9!", Role::Operator).await;
    let cookies = app.login("op", "Correct-Horse-9!").await;
    let recipient_id = seed_recipient(&app, "E100", "pat@example.com").await;

    let package = register_package(&app, &cookies, "1Z999AA10123456784", &recipient_id).await;
    assert_eq!(package["status"], "registered");
    assert_eq!(package["tracking_no"], "1Z999AA10123456784");

    let id = package["id"].as_str().expect("package id");
    let detail = app.get(&format!("/packages/{id}"), Some(&cookies)).await;
    assert_eq!(detail.status, StatusCode::OK);
    let timeline = detail.body["timeline"].as_array().expect("timeline");
    assert_eq!(timeline.len(), 1);
    assert_eq!(timeline[0]["old_status"], Value::Null);
    assert_eq!(timeline[0]["new_status"], "registered");

    assert_eq!(app.audit_count("package_created").await, 1);
}

#[tokio::test]
async fn happy_path_lifecycle_with_terminal_enforcement() {
    let app = TestApp::new();
    app.seed_user("op", "Correct-Horse-9!", Role::Operator).await;
    let cookies = app.login("op", "Correct-Horse-9!").await;
    let recipient_id = seed_recipient(&app, "E101", "kim@example.com").await;

    let package = register_package(&app, &cookies, "1Z999AA10123456784", &recipient_id).await;
    let id = package["id"].as_str().expect("id").to_string();

    let first = app
        .post_form(
            &format!("/packages/{id}/status"),
            &cookies,
            &[("status", "awaiting_pickup")],
        )
        .await;
    assert_eq!(first.status, StatusCode::OK, "{:?}", first.body);

    let second = app
        .post_form(
            &format!("/packages/{id}/status"),
            &cookies,
            &[("status", "delivered")],
        )
        .await;
    assert_eq!(second.status, StatusCode::OK);

    // Timeline chains old → new correctly.
    let detail = app.get(&format!("/packages/{id}"), Some(&cookies)).await;
    let timeline = detail.body["timeline"].as_array().expect("timeline");
    assert_eq!(timeline.len(), 3);
    assert_eq!(timeline[1]["old_status"], "registered");
    assert_eq!(timeline[1]["new_status"], "awaiting_pickup");
    assert_eq!(timeline[2]["old_status"], "awaiting_pickup");
    assert_eq!(timeline[2]["new_status"], "delivered");

    // Terminal: a further transition is refused and writes nothing.
    let refused = app
        .post_form(
            &format!("/packages/{id}/status"),
            &cookies,
            &[("status", "awaiting_pickup")],
        )
        .await;
    assert_eq!(refused.status, StatusCode::BAD_REQUEST);

    let after = app.get(&format!("/packages/{id}"), Some(&cookies)).await;
    assert_eq!(after.body["package"]["status"], "delivered");
    assert_eq!(after.body["timeline"].as_array().map(Vec::len), Some(3));
    assert_eq!(app.audit_count("package_status_changed").await, 2);
}

#[tokio::test]
async fn registration_requires_an_active_recipient() {
    let app = TestApp::new();
    app.seed_user("op", "Correct-Horse-9!", Role::Operator).await;
    let admin = app.seed_user("boss", "Correct-Horse-9!", Role::Admin).await;
    let cookies = app.login("op", "Correct-Horse-9!").await;
    let recipient_id = seed_recipient(&app, "E102", "lee@example.com").await;

    // Deactivate the recipient first (no open packages yet).
    app.state
        .recipient_service
        .deactivate(recipient_id.parse().expect("uuid"), &admin, None)
        .await
        .expect("deactivate");

    let boundary = "test-boundary-7d9f";
    let mut multipart = String::new();
    for (name, value) in [
        ("tracking_no", "1Z-INACTIVE"),
        ("carrier", "UPS"),
        ("recipient_id", recipient_id.as_str()),
        ("csrf_token", cookies.csrf.as_str()),
    ] {
        multipart.push_str(&format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
        ));
    }
    multipart.push_str(&format!("--{boundary}--\r\n"));

    let response = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/packages/new")
                .header(
                    CONTENT_TYPE,
                    format!("multipart/form-data; boundary={boundary}"),
                )
                .header(COOKIE, cookies.header())
                .header(ACCEPT, "application/json")
                .body(Body::from(multipart))
                .expect("request"),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn notes_beyond_the_limit_are_rejected() {
    let app = TestApp::new();
    app.seed_user("op", "Correct-Horse-9!", Role::Operator).await;
    let cookies = app.login("op", "Correct-Horse-9!").await;
    let recipient_id = seed_recipient(&app, "E103", "max@example.com").await;
    let package = register_package(&app, &cookies, "1Z-NOTES", &recipient_id).await;
    let id = package["id"].as_str().expect("id");

    let long_notes = "x".repeat(501);
    let response = app
        .post_form(
            &format!("/packages/{id}/status"),
            &cookies,
            &[("status", "awaiting_pickup"), ("notes", &long_notes)],
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn search_matches_tracking_number_and_recipient_name() {
    let app = TestApp::new();
    app.seed_user("op", "Correct-Horse-9!", Role::Operator).await;
    let cookies = app.login("op", "Correct-Horse-9!").await;
    let recipient_id = seed_recipient(&app, "E104", "search@example.com").await;

    register_package(&app, &cookies, "TRACK-ALPHA-1", &recipient_id).await;
    register_package(&app, &cookies, "TRACK-BETA-2", &recipient_id).await;

    let by_tracking = app.get("/packages?q=ALPHA", Some(&cookies)).await;
    assert_eq!(by_tracking.body["items"].as_array().map(Vec::len), Some(1));

    let by_name = app.get("/packages?q=Pat+Example", Some(&cookies)).await;
    assert_eq!(by_name.body["items"].as_array().map(Vec::len), Some(2));

    let by_status = app.get("/packages?status=registered", Some(&cookies)).await;
    assert_eq!(by_status.body["items"].as_array().map(Vec::len), Some(2));

    let none = app.get("/packages?q=GAMMA", Some(&cookies)).await;
    assert_eq!(none.body["items"].as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn qrcode_endpoints_build_deep_links() {
    let app = TestApp::new();
    let root = app.seed_user("root", "Correct-Horse-9!", Role::SuperAdmin).await;
    app.seed_user("op", "Correct-Horse-9!", Role::Operator).await;
    let cookies = app.login("op", "Correct-Horse-9!").await;
    let recipient_id = seed_recipient(&app, "E105", "qr@example.com").await;
    let package = register_package(&app, &cookies, "1Z-QR", &recipient_id).await;
    let id = package["id"].as_str().expect("id");

    // Without a configured base the link falls back to the request host.
    let fallback = app
        .get(&format!("/packages/{id}/qrcode/download"), Some(&cookies))
        .await;
    assert_eq!(fallback.status, StatusCode::OK);
    assert!(
        fallback.body["url"]
            .as_str()
            .expect("url")
            .ends_with(&format!("/packages/{id}"))
    );

    // A configured base wins.
    app.state
        .settings_service
        .set_qr_base_url("https://mailroom.example.com/", &root, None)
        .await
        .expect("set base url");
    let configured = app
        .get(&format!("/packages/{id}/qrcode/print"), Some(&cookies))
        .await;
    assert_eq!(
        configured.body["url"],
        format!("https://mailroom.example.com/packages/{id}")
    );
}
