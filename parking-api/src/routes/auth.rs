//! Authentication REST API Routes
//!
//! Login with email and password, and refresh-token exchange. Both return a
//! fresh access/refresh [`TokenPair`].

use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, Json};

use crate::{
    auth::{issue_token_pair, refresh_token_pair, verify_password, AuthConfig, TokenPair},
    db::DbClient,
    error::{ApiError, ApiResult},
    state::AppState,
    types::{LoginRequest, RefreshRequest},
};

fn invalid_credentials() -> ApiError {
    ApiError::unauthorized("Invalid credentials")
}

/// POST /api/auth/login - Exchange credentials for tokens
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated", body = TokenPair),
        (status = 401, description = "Invalid credentials", body = ApiError),
    ),
)]
pub async fn login(
    State(db): State<DbClient>,
    State(auth): State<Arc<AuthConfig>>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let (user_id, password_hash) = db
        .user_auth_data(&req.email)
        .await?
        .ok_or_else(invalid_credentials)?;

    let password = req.password;
    let matches = tokio::task::spawn_blocking(move || verify_password(&password, &password_hash))
        .await
        .map_err(|e| ApiError::internal_error(format!("Password check task failed: {}", e)))?;
    if !matches {
        tracing::debug!(user_id, "Login rejected");
        return Err(invalid_credentials());
    }

    tracing::info!(user_id, "User logged in");
    Ok(Json(issue_token_pair(&auth, user_id)?))
}

/// POST /api/auth/refresh - Exchange a refresh token for new tokens
#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    tag = "Auth",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New token pair", body = TokenPair),
        (status = 401, description = "Invalid or expired refresh token", body = ApiError),
    ),
)]
pub async fn refresh(
    State(auth): State<Arc<AuthConfig>>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(refresh_token_pair(&auth, &req.refresh_token)?))
}

/// Create the auth routes router.
pub fn create_router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/auth/login", axum::routing::post(login))
        .route("/auth/refresh", axum::routing::post(refresh))
}
