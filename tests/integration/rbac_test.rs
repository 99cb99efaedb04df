//! Role-based access control across the HTTP surface.

use http::StatusCode;

use mailroom_entity::user::Role;

use crate::helpers::TestApp;

#[tokio::test]
async fn operators_are_denied_the_admin_surface() {
    let app = TestApp::new();
    app.seed_user("op", "Correct-Horse-9!", Role::Operator).await;
    let cookies = app.login("op", "Correct-Horse-9!").await;

    for path in [
        "/admin/users",
        "/admin/recipients",
        "/admin/reports",
        "/admin/settings",
        "/admin/audit-logs",
    ] {
        let response = app.get(path, Some(&cookies)).await;
        assert_eq!(response.status, StatusCode::FORBIDDEN, "{path}");
    }

    // But the package surface works.
    assert_eq!(app.get("/dashboard", Some(&cookies)).await.status, StatusCode::OK);
    assert_eq!(app.get("/packages", Some(&cookies)).await.status, StatusCode::OK);
}

#[tokio::test]
async fn admins_reach_management_but_not_super_admin_surfaces() {
    let app = TestApp::new();
    app.seed_user("boss", "Correct-Horse-9!", Role::Admin).await;
    let cookies = app.login("boss", "Correct-Horse-9!").await;

    for path in ["/admin/users", "/admin/recipients", "/admin/reports"] {
        let response = app.get(path, Some(&cookies)).await;
        assert_eq!(response.status, StatusCode::OK, "{path}");
    }
    for path in ["/admin/settings", "/admin/audit-logs"] {
        let response = app.get(path, Some(&cookies)).await;
        assert_eq!(response.status, StatusCode::FORBIDDEN, "{path}");
    }
}

#[tokio::test]
async fn admins_manage_operators_only() {
    let app = TestApp::new();
    app.seed_user("boss", "Correct-Horse-9!", Role::Admin).await;
    let peer = app.seed_user("peer", "Correct-Horse-9!", Role::Admin).await;
    let cookies = app.login("boss", "Correct-Horse-9!").await;

    // Creating an operator is allowed.
    let operator = app
        .post_form(
            "/admin/users/new",
            &cookies,
            &[
                ("username", "newop"),
                ("password", "Fresh-Start-22!"),
                ("full_name", "New Operator"),
                ("role", "operator"),
            ],
        )
        .await;
    assert_eq!(operator.status, StatusCode::OK, "{:?}", operator.body);
    assert_eq!(app.audit_count("user_created").await, 1);

    // Creating an admin is not.
    let admin = app
        .post_form(
            "/admin/users/new",
            &cookies,
            &[
                ("username", "newadmin"),
                ("password", "Fresh-Start-22!"),
                ("full_name", "New Admin"),
                ("role", "admin"),
            ],
        )
        .await;
    assert_eq!(admin.status, StatusCode::FORBIDDEN);

    // Neither is acting on a fellow admin.
    let deactivate = app
        .post_form(&format!("/admin/users/{}/deactivate", peer.id), &cookies, &[])
        .await;
    assert_eq!(deactivate.status, StatusCode::FORBIDDEN);

    let reset = app
        .post_form(
            &format!("/admin/users/{}/password", peer.id),
            &cookies,
            &[("new_password", "Reset-Value-31!")],
        )
        .await;
    assert_eq!(reset.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn role_changes_require_a_super_admin_and_never_apply_to_self() {
    let app = TestApp::new();
    let root = app.seed_user("root", "Correct-Horse-9!", Role::SuperAdmin).await;
    app.seed_user("boss", "Correct-Horse-9!", Role::Admin).await;
    let target = app.seed_user("op", "Correct-Horse-9!", Role::Operator).await;

    // An admin cannot change roles at all.
    let admin_cookies = app.login("boss", "Correct-Horse-9!").await;
    let denied = app
        .put_form(
            &format!("/admin/users/{}/edit", target.id),
            &admin_cookies,
            &[("role", "admin")],
        )
        .await;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);

    // A super admin can promote.
    let root_cookies = app.login("root", "Correct-Horse-9!").await;
    let promoted = app
        .put_form(
            &format!("/admin/users/{}/edit", target.id),
            &root_cookies,
            &[("role", "admin")],
        )
        .await;
    assert_eq!(promoted.status, StatusCode::OK, "{:?}", promoted.body);
    assert_eq!(promoted.body["role"], "admin");

    // But never their own role, and never their own account's life.
    let self_change = app
        .put_form(
            &format!("/admin/users/{}/edit", root.id),
            &root_cookies,
            &[("role", "admin")],
        )
        .await;
    assert_eq!(self_change.status, StatusCode::FORBIDDEN);

    let self_deactivate = app
        .post_form(
            &format!("/admin/users/{}/deactivate", root.id),
            &root_cookies,
            &[],
        )
        .await;
    assert_eq!(self_deactivate.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn super_admin_reads_audit_logs() {
    let app = TestApp::new();
    app.seed_user("root", "Correct-Horse-9!", Role::SuperAdmin).await;
    let cookies = app.login("root", "Correct-Horse-9!").await;

    let response = app.get("/admin/audit-logs?event_type=login", Some(&cookies)).await;
    assert_eq!(response.status, StatusCode::OK);
    // The login we just made is in the log.
    assert_eq!(response.body["items"].as_array().map(Vec::len), Some(1));
    assert_eq!(response.body["items"][0]["event_type"], "login");
}

#[tokio::test]
async fn password_reset_forces_change_and_ends_sessions() {
    let app = TestApp::new();
    app.seed_user("root", "Correct-Horse-9!", Role::SuperAdmin).await;
    let target = app.seed_user("op", "Correct-Horse-9!", Role::Operator).await;

    let op_cookies = app.login("op", "Correct-Horse-9!").await;
    let root_cookies = app.login("root", "Correct-Horse-9!").await;

    let reset = app
        .post_form(
            &format!("/admin/users/{}/password", target.id),
            &root_cookies,
            &[("new_password", "Issued-By-Admin-4!")],
        )
        .await;
    assert_eq!(reset.status, StatusCode::OK, "{:?}", reset.body);
    assert_eq!(app.audit_count("password_reset").await, 1);

    // The target's old session is gone.
    let stale = app.get("/auth/me", Some(&op_cookies)).await;
    assert_eq!(stale.status, StatusCode::UNAUTHORIZED);

    // Logging in with the issued password lands on the forced change.
    let login = app.try_login("op", "Issued-By-Admin-4!").await;
    assert_eq!(login.status, StatusCode::OK);
    assert_eq!(login.body["user"]["must_change_password"], true);
    assert_eq!(login.body["redirect_url"], "/me/force-password-change");
}
