//! Route definitions and middleware stacking.
//!
//! Exact paths are load-bearing: operators' bookmarks and printed sticker
//! deep links depend on them.

use axum::extract::DefaultBodyLimit;
use axum::middleware as axum_middleware;
use axum::response::Redirect;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware;
use crate::state::AppState;

/// Build the complete router with the full middleware pipeline.
pub fn build_router(state: AppState) -> Router {
    let max_upload = state.config.max_upload_size as usize;

    let routes = Router::new()
        .route("/", get(|| async { Redirect::temporary("/auth/login") }))
        .route("/health", get(handlers::health::health_check))
        .merge(auth_routes())
        .merge(me_routes())
        .merge(package_routes())
        .merge(recipient_routes())
        .merge(admin_routes());

    // Layer order: the last layer added is the outermost. Request path:
    // deadline → authentication → CSRF → rate limit → security headers →
    // handler.
    routes
        .layer(DefaultBodyLimit::max(max_upload + 64 * 1024))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::security_headers::security_headers,
        ))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::rate_limit::rate_limiting,
        ))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::csrf::csrf_enforcement,
        ))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::authentication_binding,
        ))
        .layer(axum_middleware::from_fn(
            middleware::deadline::request_deadline,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Login, logout, identity.
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/auth/login",
            get(handlers::auth::login_page).post(handlers::auth::login),
        )
        .route("/auth/logout", post(handlers::auth::logout))
        .route("/auth/me", get(handlers::auth::me))
}

/// Self-service: password, profile, sessions.
fn me_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/me/password",
            get(handlers::me::password_page).post(handlers::me::change_password),
        )
        .route(
            "/me/force-password-change",
            get(handlers::me::password_page).post(handlers::me::force_change_password),
        )
        .route("/me/profile", get(handlers::me::profile))
        .route("/me/sessions", get(handlers::me::list_sessions))
        .route(
            "/me/sessions/{id}/terminate",
            post(handlers::me::terminate_session),
        )
}

/// Package surface, all roles.
fn package_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(handlers::dashboard::dashboard))
        .route("/packages", get(handlers::packages::list))
        .route(
            "/packages/new",
            get(handlers::packages::new_page).post(handlers::packages::create),
        )
        .route("/packages/{id}", get(handlers::packages::detail))
        .route(
            "/packages/{id}/status",
            post(handlers::packages::update_status),
        )
        .route(
            "/packages/{id}/photo",
            post(handlers::packages::attach_photo),
        )
        .route(
            "/packages/{id}/qrcode/download",
            get(handlers::packages::qrcode_download),
        )
        .route(
            "/packages/{id}/qrcode/print",
            get(handlers::packages::qrcode_print),
        )
}

/// Recipient read surface, all roles.
fn recipient_routes() -> Router<AppState> {
    Router::new()
        .route("/recipients", get(handlers::recipients::list))
        .route("/recipients/search", get(handlers::recipients::search))
}

/// Admin and super-admin surface. Permission checks live in handlers.
fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/dashboard", get(handlers::admin::dashboard::summary))
        // User management
        .route("/admin/users", get(handlers::admin::users::list))
        .route(
            "/admin/users/new",
            get(handlers::admin::users::new_page).post(handlers::admin::users::create),
        )
        .route(
            "/admin/users/{id}/edit",
            get(handlers::admin::users::edit_page).put(handlers::admin::users::update),
        )
        .route(
            "/admin/users/{id}/deactivate",
            post(handlers::admin::users::deactivate),
        )
        .route(
            "/admin/users/{id}/password",
            post(handlers::admin::users::reset_password),
        )
        // Recipient management
        .route("/admin/recipients", get(handlers::admin::recipients::list))
        .route(
            "/admin/recipients/new",
            get(handlers::admin::recipients::new_page).post(handlers::admin::recipients::create),
        )
        .route(
            "/admin/recipients/{id}/edit",
            get(handlers::admin::recipients::edit_page)
                .post(handlers::admin::recipients::update)
                .put(handlers::admin::recipients::update),
        )
        .route(
            "/admin/recipients/{id}/deactivate",
            post(handlers::admin::recipients::deactivate),
        )
        .route(
            "/admin/recipients/import",
            get(handlers::admin::recipients::import_page),
        )
        .route(
            "/admin/recipients/import/validate",
            post(handlers::admin::recipients::import_validate),
        )
        .route(
            "/admin/recipients/import/confirm",
            post(handlers::admin::recipients::import_confirm),
        )
        // Reports
        .route("/admin/reports", get(handlers::admin::reports::options))
        .route(
            "/admin/reports/preview",
            get(handlers::admin::reports::preview),
        )
        .route(
            "/admin/reports/export",
            get(handlers::admin::reports::export),
        )
        // Super admin
        .route("/admin/settings", get(handlers::admin::settings::show))
        .route(
            "/admin/settings/qr-base-url",
            post(handlers::admin::settings::set_qr_base_url),
        )
        .route("/admin/audit-logs", get(handlers::admin::audit::list))
}
