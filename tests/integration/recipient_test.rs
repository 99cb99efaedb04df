//! Recipient directory invariants and bulk import.

use http::StatusCode;
use serde_json::json;

use mailroom_entity::user::Role;

use crate::helpers::TestApp;

#[tokio::test]
async fn create_update_and_uniqueness() {
    let app = TestApp::new();
    app.seed_user("boss", "Correct-Horse-9!", Role::Admin).await;
    let cookies = app.login("boss", "Correct-Horse-9!").await;

    let created = app
        .post_form(
            "/admin/recipients/new",
            &cookies,
            &[
                ("employee_id", "E100"),
                ("name", "Pat Example"),
                ("email", "pat@example.com"),
                ("department", "Finance"),
            ],
        )
        .await;
    assert_eq!(created.status, StatusCode::OK, "{:?}", created.body);
    let id = created.body["id"].as_str().expect("id").to_string();
    assert_eq!(app.audit_count("recipient_created").await, 1);

    // Duplicate employee id and duplicate email both conflict.
    let dup_employee = app
        .post_form(
            "/admin/recipients/new",
            &cookies,
            &[
                ("employee_id", "E100"),
                ("name", "Other"),
                ("email", "other@example.com"),
                ("department", "IT"),
            ],
        )
        .await;
    assert_eq!(dup_employee.status, StatusCode::CONFLICT);

    let dup_email = app
        .post_form(
            "/admin/recipients/new",
            &cookies,
            &[
                ("employee_id", "E101"),
                ("name", "Other"),
                ("email", "pat@example.com"),
                ("department", "IT"),
            ],
        )
        .await;
    assert_eq!(dup_email.status, StatusCode::CONFLICT);

    // Department cannot be blanked on update.
    let blank_department = app
        .put_form(
            &format!("/admin/recipients/{id}/edit"),
            &cookies,
            &[
                ("name", "Pat Example"),
                ("email", "pat@example.com"),
                ("department", "   "),
            ],
        )
        .await;
    assert_eq!(blank_department.status, StatusCode::BAD_REQUEST);

    // A proper update works and is audited.
    let updated = app
        .put_form(
            &format!("/admin/recipients/{id}/edit"),
            &cookies,
            &[
                ("name", "Pat Q. Example"),
                ("email", "pat@example.com"),
                ("department", "Facilities"),
            ],
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK, "{:?}", updated.body);
    assert_eq!(updated.body["department"], "Facilities");
    assert_eq!(app.audit_count("recipient_updated").await, 1);

    let invalid_email = app
        .post_form(
            "/admin/recipients/new",
            &cookies,
            &[
                ("employee_id", "E102"),
                ("name", "Bad Email"),
                ("email", "not-an-email"),
                ("department", "IT"),
            ],
        )
        .await;
    assert_eq!(invalid_email.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn deactivation_is_blocked_by_open_packages() {
    let app = TestApp::new();
    let admin = app.seed_user("boss", "Correct-Horse-9!", Role::Admin).await;
    let cookies = app.login("boss", "Correct-Horse-9!").await;

    let created = app
        .post_form(
            "/admin/recipients/new",
            &cookies,
            &[
                ("employee_id", "E200"),
                ("name", "Busy Recipient"),
                ("email", "busy@example.com"),
                ("department", "IT"),
            ],
        )
        .await;
    let id = created.body["id"].as_str().expect("id").to_string();

    // Register a package for them (stays in a non-terminal state).
    app.state
        .package_service
        .register(
            mailroom_entity::package::CreatePackage {
                tracking_no: "1Z-OPEN".to_string(),
                carrier: "UPS".to_string(),
                recipient_id: id.parse().expect("uuid"),
                notes: None,
            },
            None,
            &admin,
            None,
        )
        .await
        .expect("register package");

    let blocked = app
        .post_form(&format!("/admin/recipients/{id}/deactivate"), &cookies, &[])
        .await;
    assert_eq!(blocked.status, StatusCode::BAD_REQUEST);
    assert_eq!(blocked.body["message"], "has_open_packages");

    // Deliver the package; deactivation now succeeds.
    let packages = app.get("/packages?q=1Z-OPEN", Some(&cookies)).await;
    let package_id = packages.body["items"][0]["id"].as_str().expect("id");
    app.post_form(
        &format!("/packages/{package_id}/status"),
        &cookies,
        &[("status", "out_for_delivery")],
    )
    .await;
    app.post_form(
        &format!("/packages/{package_id}/status"),
        &cookies,
        &[("status", "delivered")],
    )
    .await;

    let allowed = app
        .post_form(&format!("/admin/recipients/{id}/deactivate"), &cookies, &[])
        .await;
    assert_eq!(allowed.status, StatusCode::OK, "{:?}", allowed.body);
}

#[tokio::test]
async fn import_validates_then_upserts_by_employee_id() {
    let app = TestApp::new();
    app.seed_user("boss", "Correct-Horse-9!", Role::Admin).await;
    let cookies = app.login("boss", "Correct-Horse-9!").await;

    // Pre-existing recipient that the file will update.
    app.post_form(
        "/admin/recipients/new",
        &cookies,
        &[
            ("employee_id", "E300"),
            ("name", "Old Name"),
            ("email", "e300@example.com"),
            ("department", "IT"),
        ],
    )
    .await;

    let rows = json!([
        {
            "employee_id": "E300",
            "name": "New Name",
            "email": "e300@example.com",
            "department": "Facilities"
        },
        {
            "employee_id": "E301",
            "name": "Fresh Hire",
            "email": "e301@example.com",
            "department": "Finance"
        },
        {
            "employee_id": "E302",
            "name": "Broken Row",
            "email": "not-an-email",
            "department": "Finance"
        }
    ]);

    // Dry run: reports actions without writing.
    let validated = app
        .post_json("/admin/recipients/import/validate", &cookies, rows.clone())
        .await;
    assert_eq!(validated.status, StatusCode::OK, "{:?}", validated.body);
    let reports = validated.body.as_array().expect("reports");
    assert_eq!(reports[0]["action"], "update");
    assert_eq!(reports[1]["action"], "insert");
    assert_eq!(reports[2]["action"], "error");

    let before = app.get("/admin/recipients?q=Fresh", Some(&cookies)).await;
    assert_eq!(before.body["items"].as_array().map(Vec::len), Some(0));

    // Confirm: applies the valid rows and summarizes.
    let confirmed = app
        .post_json("/admin/recipients/import/confirm", &cookies, rows)
        .await;
    assert_eq!(confirmed.status, StatusCode::OK, "{:?}", confirmed.body);
    assert_eq!(confirmed.body["inserted"], 1);
    assert_eq!(confirmed.body["updated"], 1);
    assert_eq!(confirmed.body["failed"], 1);

    let updated = app.get("/admin/recipients?q=E300", Some(&cookies)).await;
    assert_eq!(updated.body["items"][0]["name"], "New Name");
    assert_eq!(updated.body["items"][0]["department"], "Facilities");

    let inserted = app.get("/admin/recipients?q=Fresh", Some(&cookies)).await;
    assert_eq!(inserted.body["items"].as_array().map(Vec::len), Some(1));

    assert_eq!(app.audit_count("recipient_imported").await, 1);
}

#[tokio::test]
async fn search_is_content_negotiated() {
    let app = TestApp::new();
    app.seed_user("op", "Correct-Horse-9!", Role::Operator).await;
    app.seed_user("boss", "Correct-Horse-9!", Role::Admin).await;
    let admin = app.login("boss", "Correct-Horse-9!").await;
    app.post_form(
        "/admin/recipients/new",
        &admin,
        &[
            ("employee_id", "E400"),
            ("name", "Search Target"),
            ("email", "target@example.com"),
            ("department", "IT"),
        ],
    )
    .await;

    let cookies = app.login("op", "Correct-Horse-9!").await;

    // JSON for API callers.
    let json_response = app.get("/recipients/search?q=Target", Some(&cookies)).await;
    assert_eq!(json_response.status, StatusCode::OK);
    assert_eq!(json_response.body.as_array().map(Vec::len), Some(1));

    // HTML partial for the form widget.
    let html_response = app
        .send(
            http::Request::builder()
                .method("GET")
                .uri("/recipients/search?q=Target")
                .header(http::header::COOKIE, cookies.header())
                .header(http::header::ACCEPT, "text/html")
                .body(axum::body::Body::empty())
                .expect("request"),
        )
        .await;
    assert_eq!(html_response.status, StatusCode::OK);
    let content_type = html_response
        .headers
        .get(http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .expect("content type");
    assert!(content_type.starts_with("text/html"));
}
