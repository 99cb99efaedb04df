//! Handler-side extractors over values the middleware attached.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use mailroom_core::error::AppError;
use mailroom_entity::user::Role;
use mailroom_service::context::RequestContext;

use crate::middleware::csrf::CsrfGuard;
use crate::state::AppState;

/// The authenticated caller, attached by the authentication middleware.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub RequestContext);

impl CurrentUser {
    /// The caller's role.
    pub fn role(&self) -> Role {
        self.0.role()
    }
}

impl std::ops::Deref for CurrentUser {
    type Target = RequestContext;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| AppError::unauthenticated("Authentication required"))
    }
}

/// The request's CSRF expectation, attached by the CSRF middleware.
/// Handlers receiving form bodies call `verify_form` with the submitted
/// token.
#[derive(Clone)]
pub struct Csrf(pub CsrfGuard);

impl std::ops::Deref for Csrf {
    type Target = CsrfGuard;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromRequestParts<AppState> for Csrf {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CsrfGuard>()
            .cloned()
            .map(Csrf)
            .ok_or_else(|| AppError::internal("CSRF expectation missing from request"))
    }
}
