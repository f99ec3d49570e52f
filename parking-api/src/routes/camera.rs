//! Camera REST API Routes
//!
//! Cameras are mounted under `/cv` next to the CV endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use parking_core::{Camera, CameraId};

use crate::{
    db::DbClient,
    error::{ApiError, ApiResult},
    state::AppState,
    types::{CameraDeletedResponse, CreateCameraRequest, UpdateCameraRequest},
};

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// GET /cv/cameras - List cameras
#[utoipa::path(
    get,
    path = "/cv/cameras",
    tag = "Cameras",
    responses(
        (status = 200, description = "All cameras", body = Vec<Camera>),
    ),
)]
pub async fn list_cameras(State(db): State<DbClient>) -> ApiResult<impl IntoResponse> {
    Ok(Json(db.camera_list().await?))
}

/// GET /cv/cameras/{id} - Get a camera
#[utoipa::path(
    get,
    path = "/cv/cameras/{id}",
    tag = "Cameras",
    params(
        ("id" = i32, Path, description = "Camera ID")
    ),
    responses(
        (status = 200, description = "Camera details", body = Camera),
        (status = 404, description = "Camera not found", body = ApiError),
    ),
)]
pub async fn get_camera(
    State(db): State<DbClient>,
    Path(id): Path<CameraId>,
) -> ApiResult<impl IntoResponse> {
    let camera = db.camera_get(id).await?.ok_or_else(ApiError::camera_not_found)?;
    Ok(Json(camera))
}

/// POST /cv/cameras - Register a camera
#[utoipa::path(
    post,
    path = "/cv/cameras",
    tag = "Cameras",
    request_body = CreateCameraRequest,
    responses(
        (status = 201, description = "Camera created", body = Camera),
    ),
)]
pub async fn create_camera(
    State(db): State<DbClient>,
    Json(req): Json<CreateCameraRequest>,
) -> ApiResult<impl IntoResponse> {
    let camera = db.camera_create(&req).await?;
    tracing::info!(camera_id = camera.id, "Camera created");
    Ok((StatusCode::CREATED, Json(camera)))
}

/// PATCH /cv/cameras/{id} - Update a camera
#[utoipa::path(
    patch,
    path = "/cv/cameras/{id}",
    tag = "Cameras",
    params(
        ("id" = i32, Path, description = "Camera ID")
    ),
    request_body = UpdateCameraRequest,
    responses(
        (status = 200, description = "Camera updated", body = Camera),
        (status = 400, description = "No fields to update", body = ApiError),
        (status = 404, description = "Camera not found", body = ApiError),
    ),
)]
pub async fn update_camera(
    State(db): State<DbClient>,
    Path(id): Path<CameraId>,
    Json(req): Json<UpdateCameraRequest>,
) -> ApiResult<impl IntoResponse> {
    let camera = db
        .camera_update(id, &req)
        .await?
        .ok_or_else(ApiError::camera_not_found)?;
    Ok(Json(camera))
}

/// DELETE /cv/cameras/{id} - Delete a camera
#[utoipa::path(
    delete,
    path = "/cv/cameras/{id}",
    tag = "Cameras",
    params(
        ("id" = i32, Path, description = "Camera ID")
    ),
    responses(
        (status = 200, description = "Camera deleted", body = CameraDeletedResponse),
        (status = 404, description = "Camera not found", body = ApiError),
    ),
)]
pub async fn delete_camera(
    State(db): State<DbClient>,
    Path(id): Path<CameraId>,
) -> ApiResult<impl IntoResponse> {
    let id = db
        .camera_delete(id)
        .await?
        .ok_or_else(ApiError::camera_not_found)?;
    Ok(Json(CameraDeletedResponse { id }))
}

// ============================================================================
// ROUTER SETUP
// ============================================================================

/// Create the camera routes router.
pub fn create_router() -> axum::Router<AppState> {
    axum::Router::new()
        .route(
            "/cameras",
            axum::routing::get(list_cameras).post(create_camera),
        )
        .route(
            "/cameras/:id",
            axum::routing::get(get_camera)
                .patch(update_camera)
                .delete(delete_camera),
        )
}
