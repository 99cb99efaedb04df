//! Login flow: success, generic failures, lockout, audit coverage.

use http::StatusCode;

use mailroom_entity::user::Role;

use crate::helpers::TestApp;

#[tokio::test]
async fn successful_login_sets_session_cookie_and_audits() {
    let app = TestApp::new();
    app.seed_user("jdoe", "Correct-Horse-9!", Role::Operator).await;

    let response = app.try_login("jdoe", "Correct-Horse-9!").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["success"], true);
    assert_eq!(response.body["redirect_url"], "/dashboard");
    assert_eq!(response.body["user"]["username"], "jdoe");
    assert_eq!(response.body["user"]["role"], "operator");
    assert_eq!(response.body["user"]["must_change_password"], false);

    let token = response.cookie("session_token").expect("session cookie");
    assert!(token.len() >= 43, "token too short: {}", token.len());

    assert_eq!(app.audit_count("login").await, 1);
    assert_eq!(app.audit_count("login_failed").await, 0);
}

#[tokio::test]
async fn unknown_user_gets_the_same_generic_failure() {
    let app = TestApp::new();
    app.seed_user("jdoe", "Correct-Horse-9!", Role::Operator).await;

    let unknown = app.try_login("nobody", "Correct-Horse-9!").await;
    assert_eq!(unknown.status, StatusCode::UNAUTHORIZED);

    let bad_password = app.try_login("jdoe", "Wrong-Horse-9!").await;
    assert_eq!(bad_password.status, StatusCode::UNAUTHORIZED);

    // Same message either way: no user enumeration.
    assert_eq!(unknown.body["message"], bad_password.body["message"]);
    assert_eq!(app.audit_count("login_failed").await, 2);
}

#[tokio::test]
async fn inactive_account_cannot_login() {
    let app = TestApp::new();
    app.seed_user_with("gone", "Correct-Horse-9!", Role::Operator, |u| {
        u.is_active = false;
    })
    .await;

    let response = app.try_login("gone", "Correct-Horse-9!").await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(app.audit_count("login_failed").await, 1);
}

#[tokio::test]
async fn fifth_failure_locks_the_account() {
    let app = TestApp::new();
    // Four strikes already on record.
    app.seed_user_with("jdoe", "Correct-Horse-9!", Role::Operator, |u| {
        u.failed_login_count = 4;
    })
    .await;

    let response = app.try_login("jdoe", "Wrong-Horse-9!").await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let user = app
        .state
        .users
        .find_by_username("jdoe")
        .await
        .expect("lookup")
        .expect("user");
    assert_eq!(user.failed_login_count, 5);
    assert!(user.locked_until.is_some(), "lockout deadline set");

    assert_eq!(app.audit_count("account_locked").await, 1);
    assert_eq!(app.audit_count("login_failed").await, 1);

    // The correct password is now refused with a lockout message and no
    // session is created.
    let retry = app.try_login("jdoe", "Correct-Horse-9!").await;
    assert_eq!(retry.status, StatusCode::FORBIDDEN);
    assert!(retry.cookie("session_token").is_none());
}

#[tokio::test]
async fn success_at_four_failures_resets_the_counter() {
    let app = TestApp::new();
    app.seed_user_with("jdoe", "Correct-Horse-9!", Role::Operator, |u| {
        u.failed_login_count = 4;
    })
    .await;

    let response = app.try_login("jdoe", "Correct-Horse-9!").await;
    assert_eq!(response.status, StatusCode::OK);

    let user = app
        .state
        .users
        .find_by_username("jdoe")
        .await
        .expect("lookup")
        .expect("user");
    assert_eq!(user.failed_login_count, 0);
    assert!(user.locked_until.is_none());
}

#[tokio::test]
async fn must_change_password_confines_navigation() {
    let app = TestApp::new();
    app.seed_user_with("fresh", "Correct-Horse-9!", Role::Operator, |u| {
        u.must_change_password = true;
    })
    .await;

    let login = app.try_login("fresh", "Correct-Horse-9!").await;
    assert_eq!(login.status, StatusCode::OK);
    assert_eq!(login.body["redirect_url"], "/me/force-password-change");
    let cookies = crate::helpers::AuthCookies {
        session: login.cookie("session_token").expect("session"),
        csrf: login.cookie("csrf_token").expect("csrf"),
    };

    // Any other page is refused until the password changes.
    let dashboard = app.get("/dashboard", Some(&cookies)).await;
    assert_eq!(dashboard.status, StatusCode::FORBIDDEN);

    // The forced-change endpoint works, and completing it unlocks the app.
    let change = app
        .post_form(
            "/me/force-password-change",
            &cookies,
            &[
                ("current_password", "Correct-Horse-9!"),
                ("new_password", "Another-Stable-7?"),
            ],
        )
        .await;
    assert_eq!(change.status, StatusCode::OK, "{:?}", change.body);

    let dashboard = app.get("/dashboard", Some(&cookies)).await;
    assert_eq!(dashboard.status, StatusCode::OK);
}

#[tokio::test]
async fn password_change_round_trip_and_history() {
    let app = TestApp::new();
    app.seed_user("jdoe", "Correct-Horse-9!", Role::Operator).await;
    let cookies = app.login("jdoe", "Correct-Horse-9!").await;

    let change = app
        .post_form(
            "/me/password",
            &cookies,
            &[
                ("current_password", "Correct-Horse-9!"),
                ("new_password", "Another-Stable-7?"),
            ],
        )
        .await;
    assert_eq!(change.status, StatusCode::OK, "{:?}", change.body);
    assert_eq!(app.audit_count("password_changed").await, 1);

    // Old password no longer verifies; the new one does.
    let old = app.try_login("jdoe", "Correct-Horse-9!").await;
    assert_eq!(old.status, StatusCode::UNAUTHORIZED);
    let cookies = app.login("jdoe", "Another-Stable-7?").await;

    // Replaying the same change fails: the new password is in history.
    let replay = app
        .post_form(
            "/me/password",
            &cookies,
            &[
                ("current_password", "Another-Stable-7?"),
                ("new_password", "Another-Stable-7?"),
            ],
        )
        .await;
    assert_eq!(replay.status, StatusCode::BAD_REQUEST);

    // And so is the original password.
    let reuse = app
        .post_form(
            "/me/password",
            &cookies,
            &[
                ("current_password", "Another-Stable-7?"),
                ("new_password", "Correct-Horse-9!"),
            ],
        )
        .await;
    assert_eq!(reuse.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn weak_passwords_are_rejected_with_actionable_messages() {
    let app = TestApp::new();
    app.seed_user("jdoe", "Correct-Horse-9!", Role::Operator).await;
    let cookies = app.login("jdoe", "Correct-Horse-9!").await;

    for weak in ["short1!A", "nouppercase-99!", "NOLOWERCASE-99!", "NoDigitsHere!!", "NoSpecials99A"] {
        let response = app
            .post_form(
                "/me/password",
                &cookies,
                &[
                    ("current_password", "Correct-Horse-9!"),
                    ("new_password", weak),
                ],
            )
            .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{weak}");
        assert!(
            response.body["message"].as_str().unwrap_or("").contains("Password"),
            "message should explain the rule: {:?}",
            response.body
        );
    }
}

#[tokio::test]
async fn health_is_public_and_reports_checks() {
    let app = TestApp::new();
    let response = app.get("/health", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "healthy");
    assert_eq!(response.body["checks"]["database"]["status"], "healthy");
    assert!(response.body["checks"]["uptime"]["seconds"].is_number());
}
