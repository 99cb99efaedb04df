//! Session lifecycle: concurrency cap, expiry, self-service management.

use http::StatusCode;

use mailroom_entity::user::Role;

use crate::helpers::{AuthCookies, TestApp};

#[tokio::test]
async fn fourth_login_evicts_the_oldest_session() {
    let app = TestApp::new();
    app.seed_user("jdoe", "Correct-Horse-9!", Role::Operator).await;

    let s1 = app.login("jdoe", "Correct-Horse-9!").await;
    let s2 = app.login("jdoe", "Correct-Horse-9!").await;
    let s3 = app.login("jdoe", "Correct-Horse-9!").await;
    let s4 = app.login("jdoe", "Correct-Horse-9!").await;

    // The oldest session is gone; the three newest still work.
    let evicted = app.get("/auth/me", Some(&s1)).await;
    assert_eq!(evicted.status, StatusCode::UNAUTHORIZED);

    for cookies in [&s2, &s3, &s4] {
        let alive = app.get("/auth/me", Some(cookies)).await;
        assert_eq!(alive.status, StatusCode::OK);
    }

    let sessions = app.get("/me/sessions", Some(&s4)).await;
    assert_eq!(sessions.status, StatusCode::OK);
    assert_eq!(sessions.body.as_array().map(Vec::len), Some(3));
}

#[tokio::test]
async fn expired_sessions_are_treated_as_absent() {
    let app = TestApp::new();
    app.seed_user("jdoe", "Correct-Horse-9!", Role::Operator).await;
    let cookies = app.login("jdoe", "Correct-Horse-9!").await;

    // Force the session to the expiry boundary: expires_at == now must
    // read as expired.
    let token = cookies.session.clone();
    app.state
        .queue
        .submit(mailroom_database::WriteStmt::new(
            "UPDATE sessions SET expires_at = ?1 WHERE token = ?2",
            vec![
                mailroom_database::params::timestamp(chrono::Utc::now()),
                mailroom_database::params::text(token),
            ],
        ))
        .await
        .expect("expire session");

    let response = app.get("/auth/me", Some(&cookies)).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_terminates_the_session_and_audits() {
    let app = TestApp::new();
    app.seed_user("jdoe", "Correct-Horse-9!", Role::Operator).await;
    let cookies = app.login("jdoe", "Correct-Horse-9!").await;

    let logout = app.post_form("/auth/logout", &cookies, &[]).await;
    assert_eq!(logout.status, StatusCode::SEE_OTHER);

    let after = app.get("/auth/me", Some(&cookies)).await;
    assert_eq!(after.status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.audit_count("logout").await, 1);
}

#[tokio::test]
async fn a_user_can_terminate_their_own_session_but_not_others() {
    let app = TestApp::new();
    app.seed_user("jdoe", "Correct-Horse-9!", Role::Operator).await;
    app.seed_user("asmith", "Correct-Horse-8!", Role::Operator).await;

    let mine_a = app.login("jdoe", "Correct-Horse-9!").await;
    let mine_b = app.login("jdoe", "Correct-Horse-9!").await;
    let theirs = app.login("asmith", "Correct-Horse-8!").await;

    // Find the id of session A from B's view.
    let sessions = app.get("/me/sessions", Some(&mine_b)).await;
    let other_id = sessions.body.as_array().expect("array").iter()
        .find(|s| s["current"] == false)
        .and_then(|s| s["id"].as_str())
        .expect("other session id")
        .to_string();

    let terminated = app
        .post_form(
            &format!("/me/sessions/{other_id}/terminate"),
            &mine_b,
            &[],
        )
        .await;
    assert_eq!(terminated.status, StatusCode::OK);
    assert_eq!(app.get("/auth/me", Some(&mine_a)).await.status, StatusCode::UNAUTHORIZED);

    // A foreign session id terminates nothing.
    let their_sessions = app.get("/me/sessions", Some(&theirs)).await;
    let their_id = their_sessions.body[0]["id"].as_str().expect("id").to_string();
    let cross = app
        .post_form(
            &format!("/me/sessions/{their_id}/terminate"),
            &mine_b,
            &[],
        )
        .await;
    assert_eq!(cross.status, StatusCode::NOT_FOUND);
    assert_eq!(app.get("/auth/me", Some(&theirs)).await.status, StatusCode::OK);
}

#[tokio::test]
async fn unauthenticated_browser_requests_redirect_to_login() {
    let app = TestApp::new();
    // No Accept: application/json → HTML navigation semantics.
    let response = app
        .send(
            http::Request::builder()
                .method("GET")
                .uri("/dashboard")
                .body(axum::body::Body::empty())
                .expect("request"),
        )
        .await;
    assert_eq!(response.status, StatusCode::TEMPORARY_REDIRECT);
    let location = response
        .headers
        .get(http::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .expect("location");
    assert!(location.starts_with("/auth/login?next="));
}

#[tokio::test]
async fn deactivating_a_user_ends_their_sessions() {
    let app = TestApp::new();
    app.seed_user("root", "Correct-Horse-9!", Role::SuperAdmin).await;
    let target = app.seed_user("jdoe", "Correct-Horse-9!", Role::Operator).await;
    let admin_cookies = app.login("root", "Correct-Horse-9!").await;
    let target_cookies: AuthCookies = app.login("jdoe", "Correct-Horse-9!").await;

    let response = app
        .post_form(
            &format!("/admin/users/{}/deactivate", target.id),
            &admin_cookies,
            &[],
        )
        .await;
    assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);

    let after = app.get("/auth/me", Some(&target_cookies)).await;
    assert_eq!(after.status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.audit_count("user_deactivated").await, 1);
}
