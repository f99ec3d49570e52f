//! Favorite Parkings REST API Routes
//!
//! Every handler requires a bearer access token and only lets callers touch
//! their own favorites.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use parking_core::{FavoriteParkingSummary, UserId};

use crate::{
    db::DbClient,
    error::{ApiError, ApiResult},
    middleware::AuthExtractor,
    state::AppState,
    types::{FavoriteCreatedResponse, FavoriteRequest},
};

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// GET /favorite_parkings/favorites/{user_id} - List a user's favorites
#[utoipa::path(
    get,
    path = "/favorite_parkings/favorites/{user_id}",
    tag = "Favorites",
    params(
        ("user_id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Favorite parkings", body = Vec<FavoriteParkingSummary>),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 403, description = "Forbidden", body = ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_favorites(
    State(db): State<DbClient>,
    AuthExtractor(auth): AuthExtractor,
    Path(user_id): Path<UserId>,
) -> ApiResult<impl IntoResponse> {
    auth.ensure_user(user_id)?;
    Ok(Json(db.favorite_list(user_id).await?))
}

/// POST /favorite_parkings/favorites - Add a parking to favorites
#[utoipa::path(
    post,
    path = "/favorite_parkings/favorites",
    tag = "Favorites",
    request_body = FavoriteRequest,
    responses(
        (status = 201, description = "Favorite added", body = FavoriteCreatedResponse),
        (status = 403, description = "Forbidden", body = ApiError),
        (status = 404, description = "User or Parking not found", body = ApiError),
        (status = 409, description = "Already in favorites", body = ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn add_favorite(
    State(db): State<DbClient>,
    AuthExtractor(auth): AuthExtractor,
    Json(req): Json<FavoriteRequest>,
) -> ApiResult<impl IntoResponse> {
    auth.ensure_user(req.id_user)?;
    let id = db.favorite_add(&req).await?;
    tracing::info!(user_id = req.id_user, parking_id = req.id_parking, "Favorite added");
    Ok((
        StatusCode::CREATED,
        Json(FavoriteCreatedResponse {
            id,
            message: "Parking added to favorites".to_string(),
        }),
    ))
}

/// DELETE /favorite_parkings/favorites - Remove a parking from favorites
#[utoipa::path(
    delete,
    path = "/favorite_parkings/favorites",
    tag = "Favorites",
    params(FavoriteRequest),
    responses(
        (status = 204, description = "Favorite removed"),
        (status = 403, description = "Forbidden", body = ApiError),
        (status = 404, description = "Favorite relationship not found", body = ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn remove_favorite(
    State(db): State<DbClient>,
    AuthExtractor(auth): AuthExtractor,
    Query(req): Query<FavoriteRequest>,
) -> ApiResult<StatusCode> {
    auth.ensure_user(req.id_user)?;
    db.favorite_remove(&req)
        .await?
        .ok_or_else(|| ApiError::not_found("Favorite relationship not found"))?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// ROUTER SETUP
// ============================================================================

/// Create the favorites router. Callers must layer `auth_middleware` on it.
pub fn create_router() -> axum::Router<AppState> {
    axum::Router::new()
        .route(
            "/favorites",
            axum::routing::post(add_favorite).delete(remove_favorite),
        )
        .route("/favorites/:user_id", axum::routing::get(list_favorites))
}
