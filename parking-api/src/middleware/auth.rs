//! Axum Middleware for Bearer Authentication
//!
//! Validates the access token on protected routers and injects the
//! authenticated [`AuthContext`] into request extensions. Handlers read it
//! back with the [`AuthExtractor`] extractor.

use crate::auth::{authenticate_bearer, AuthConfig, AuthContext};
use crate::error::ApiError;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

// ============================================================================
// MIDDLEWARE STATE
// ============================================================================

/// Shared state for authentication middleware.
#[derive(Debug, Clone)]
pub struct AuthMiddlewareState {
    pub auth_config: Arc<AuthConfig>,
}

impl AuthMiddlewareState {
    pub fn new(auth_config: Arc<AuthConfig>) -> Self {
        Self { auth_config }
    }
}

// ============================================================================
// MIDDLEWARE FUNCTION
// ============================================================================

/// Reject requests without a valid access token.
///
/// ```ignore
/// let app = Router::new()
///     .route("/favorites/:user_id", get(get_favorites))
///     .layer(middleware::from_fn_with_state(auth_state, auth_middleware));
/// ```
pub async fn auth_middleware(
    State(state): State<AuthMiddlewareState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthMiddlewareError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let auth_context =
        authenticate_bearer(&state.auth_config, auth_header).map_err(AuthMiddlewareError)?;

    tracing::debug!(user_id = auth_context.user_id, "Request authenticated");
    request.extensions_mut().insert(auth_context);

    Ok(next.run(request).await)
}

// ============================================================================
// ERROR HANDLING
// ============================================================================

/// Error wrapper for middleware that implements IntoResponse.
#[derive(Debug)]
pub struct AuthMiddlewareError(pub ApiError);

impl IntoResponse for AuthMiddlewareError {
    fn into_response(self) -> Response {
        let mut response = self.0.into_response();
        if response.status() == axum::http::StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                header::HeaderValue::from_static("Bearer"),
            );
        }
        response
    }
}

// ============================================================================
// TYPED EXTRACTOR
// ============================================================================

/// Typed extractor for the authenticated caller.
///
/// The `auth_middleware` must be applied to the route; without it the
/// extractor fails with a 500.
#[derive(Debug, Clone)]
pub struct AuthExtractor(pub AuthContext);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthExtractor
where
    S: Send + Sync,
{
    type Rejection = AuthMiddlewareError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .copied()
            .map(AuthExtractor)
            .ok_or_else(|| {
                AuthMiddlewareError(ApiError::internal_error(
                    "AuthContext not found in request extensions. \
                     Ensure auth_middleware is applied to this route.",
                ))
            })
    }
}

impl std::ops::Deref for AuthExtractor {
    type Target = AuthContext;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
