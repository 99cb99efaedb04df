//! System settings: the sticker base URL.

use http::StatusCode;

use mailroom_entity::user::Role;

use crate::helpers::TestApp;

#[tokio::test]
async fn unset_value_reads_as_not_set() {
    let app = TestApp::new();
    app.seed_user("root", "Correct-Horse-9!", Role::SuperAdmin).await;
    let cookies = app.login("root", "Correct-Horse-9!").await;

    let response = app.get("/admin/settings", Some(&cookies)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body["qr_base_url"].is_null());
}

#[tokio::test]
async fn set_validates_normalizes_and_audits() {
    let app = TestApp::new();
    app.seed_user("root", "Correct-Horse-9!", Role::SuperAdmin).await;
    let cookies = app.login("root", "Correct-Horse-9!").await;

    // Scheme is mandatory.
    let invalid = app
        .post_form(
            "/admin/settings/qr-base-url",
            &cookies,
            &[("qr_base_url", "mailroom.example.com")],
        )
        .await;
    assert_eq!(invalid.status, StatusCode::BAD_REQUEST);

    // A valid URL is stored with its trailing slash stripped.
    let set = app
        .post_form(
            "/admin/settings/qr-base-url",
            &cookies,
            &[("qr_base_url", "https://mailroom.example.com/")],
        )
        .await;
    assert_eq!(set.status, StatusCode::OK, "{:?}", set.body);
    assert_eq!(set.body["qr_base_url"], "https://mailroom.example.com");

    let read_back = app.get("/admin/settings", Some(&cookies)).await;
    assert_eq!(read_back.body["qr_base_url"], "https://mailroom.example.com");

    assert_eq!(app.audit_count("system_settings_change").await, 1);

    // Overwriting audits again with old and new values.
    let overwrite = app
        .post_form(
            "/admin/settings/qr-base-url",
            &cookies,
            &[("qr_base_url", "http://internal.example")],
        )
        .await;
    assert_eq!(overwrite.status, StatusCode::OK);
    assert_eq!(app.audit_count("system_settings_change").await, 2);

    let log = app
        .get(
            "/admin/audit-logs?event_type=system_settings_change",
            Some(&cookies),
        )
        .await;
    let newest = &log.body["items"][0];
    assert_eq!(newest["details"]["old_value"], "https://mailroom.example.com");
    assert_eq!(newest["details"]["new_value"], "http://internal.example");
}

#[tokio::test]
async fn only_super_admins_may_edit_settings() {
    let app = TestApp::new();
    app.seed_user("boss", "Correct-Horse-9!", Role::Admin).await;
    let cookies = app.login("boss", "Correct-Horse-9!").await;

    let response = app
        .post_form(
            "/admin/settings/qr-base-url",
            &cookies,
            &[("qr_base_url", "https://mailroom.example.com")],
        )
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(app.audit_count("system_settings_change").await, 0);
}
