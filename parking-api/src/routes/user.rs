//! User REST API Routes
//!
//! Account management and subscription statistics. Passwords arrive in
//! plain text and are stored as bcrypt hashes; hashes never leave the
//! process.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use parking_core::{FieldSelection, User, UserId, UserStats};
use serde_json::Value as JsonValue;

use crate::{
    auth::hash_password,
    db::DbClient,
    error::{ApiError, ApiResult},
    state::AppState,
    types::{CreateUserRequest, FieldsQuery, UpdateUserRequest},
};

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// GET /api/users/all - List users
#[utoipa::path(
    get,
    path = "/api/users/all",
    tag = "Users",
    responses(
        (status = 200, description = "All users", body = Vec<User>),
    ),
)]
pub async fn list_users(State(db): State<DbClient>) -> ApiResult<impl IntoResponse> {
    Ok(Json(db.user_list().await?))
}

/// GET /api/users/stats - Subscription statistics
#[utoipa::path(
    get,
    path = "/api/users/stats",
    tag = "Users",
    responses(
        (status = 200, description = "User statistics", body = UserStats),
    ),
)]
pub async fn user_stats(State(db): State<DbClient>) -> ApiResult<impl IntoResponse> {
    Ok(Json(db.user_stats().await?))
}

/// GET /api/user/{id} - Get a user
#[utoipa::path(
    get,
    path = "/api/user/{id}",
    tag = "Users",
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User details", body = User),
        (status = 404, description = "User not found", body = ApiError),
    ),
)]
pub async fn get_user(
    State(db): State<DbClient>,
    Path(id): Path<UserId>,
) -> ApiResult<impl IntoResponse> {
    let user = db.user_get(id).await?.ok_or_else(ApiError::user_not_found)?;
    Ok(Json(user))
}

/// GET /api/user_fields/{id} - Selected fields of a user
#[utoipa::path(
    get,
    path = "/api/user_fields/{id}",
    tag = "Users",
    params(
        ("id" = i32, Path, description = "User ID"),
        FieldsQuery,
    ),
    responses(
        (status = 200, description = "Requested fields only", body = Object),
        (status = 400, description = "Unknown field requested", body = ApiError),
        (status = 404, description = "User not found", body = ApiError),
    ),
)]
pub async fn get_user_fields(
    State(db): State<DbClient>,
    Path(id): Path<UserId>,
    Query(query): Query<FieldsQuery>,
) -> ApiResult<impl IntoResponse> {
    let selection = FieldSelection::parse::<User>(&query.fields)?;
    let user = db.user_get(id).await?.ok_or_else(ApiError::user_not_found)?;
    Ok(Json(JsonValue::Object(selection.project(&user)?)))
}

/// POST /api/users - Register a user
#[utoipa::path(
    post,
    path = "/api/users",
    tag = "Users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 400, description = "Email already exists", body = ApiError),
    ),
)]
pub async fn create_user(
    State(db): State<DbClient>,
    Json(req): Json<CreateUserRequest>,
) -> ApiResult<impl IntoResponse> {
    if req.email.trim().is_empty() {
        return Err(ApiError::missing_field("email"));
    }
    if req.password.is_empty() {
        return Err(ApiError::missing_field("password"));
    }

    let password = req.password.clone();
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| ApiError::internal_error(format!("Password hashing task failed: {}", e)))??;

    let user = db.user_create(&req, &password_hash).await?;
    tracing::info!(user_id = user.id, "User created");
    Ok((StatusCode::CREATED, Json(user)))
}

/// PUT /api/user/{id} - Update contact or subscription
#[utoipa::path(
    put,
    path = "/api/user/{id}",
    tag = "Users",
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = User),
        (status = 400, description = "No fields to update", body = ApiError),
        (status = 404, description = "User not found", body = ApiError),
    ),
)]
pub async fn update_user(
    State(db): State<DbClient>,
    Path(id): Path<UserId>,
    Json(req): Json<UpdateUserRequest>,
) -> ApiResult<impl IntoResponse> {
    let user = db
        .user_update(id, &req)
        .await?
        .ok_or_else(ApiError::user_not_found)?;
    Ok(Json(user))
}

/// DELETE /api/user/{id} - Delete a user
#[utoipa::path(
    delete,
    path = "/api/user/{id}",
    tag = "Users",
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 204, description = "User deleted"),
        (status = 404, description = "User not found", body = ApiError),
    ),
)]
pub async fn delete_user(
    State(db): State<DbClient>,
    Path(id): Path<UserId>,
) -> ApiResult<StatusCode> {
    if !db.user_delete(id).await? {
        return Err(ApiError::user_not_found());
    }
    tracing::info!(user_id = id, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// ROUTER SETUP
// ============================================================================

/// Create the user routes router.
pub fn create_router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/users/all", axum::routing::get(list_users))
        .route("/users/stats", axum::routing::get(user_stats))
        .route("/users", axum::routing::post(create_user))
        .route(
            "/user/:id",
            axum::routing::get(get_user)
                .put(update_user)
                .delete(delete_user),
        )
        .route("/user_fields/:id", axum::routing::get(get_user_fields))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::harness;
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_password_hash_is_not_projectable() -> Result<(), String> {
        let app = create_router().with_state(harness().state);
        let request = Request::builder()
            .uri("/user_fields/1?fields=email,password_hash")
            .body(Body::empty())
            .map_err(|e| e.to_string())?;

        let response = app
            .oneshot(request)
            .await
            .map_err(|e| format!("Request failed: {:?}", e))?;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn test_create_user_requires_password() -> Result<(), String> {
        let app = create_router().with_state(harness().state);
        let request = Request::builder()
            .method("POST")
            .uri("/users")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"email": "driver@parkings.app", "password": ""}"#))
            .map_err(|e| e.to_string())?;

        let response = app
            .oneshot(request)
            .await
            .map_err(|e| format!("Request failed: {:?}", e))?;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[test]
    fn test_user_serialization_hides_hash() -> Result<(), serde_json::Error> {
        let user = User {
            id: 1,
            email: "driver@parkings.app".to_string(),
            phone_number: None,
            password_hash: "$2b$12$secret".to_string(),
            subscription_status: true,
        };
        let json = serde_json::to_string(&user)?;
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("secret"));
        Ok(())
    }
}
