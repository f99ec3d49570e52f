//! Computer-Vision REST API Routes
//!
//! Endpoints used by the CV pipeline: reading a camera's raw payload and
//! pushing or reading parking occupancy. Occupancy traffic goes exclusively
//! through the cache-aside [`OccupancyCache`].

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use parking_core::{CameraId, OccupancyRecord, ParkingId, StorageError};
use parking_storage::OccupancyCache;

use crate::{
    db::DbClient,
    error::{ApiError, ApiResult},
    state::AppState,
    types::{MessageResponse, OccupancyUpdateRequest},
};

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// GET /cv/data/{id_cam} - Raw CV payload of a camera
#[utoipa::path(
    get,
    path = "/cv/data/{id_cam}",
    tag = "CV",
    params(
        ("id_cam" = i32, Path, description = "Camera ID")
    ),
    responses(
        (status = 200, description = "Camera CV data", body = Object),
        (status = 404, description = "Camera not found", body = ApiError),
    ),
)]
pub async fn get_cv_data(
    State(db): State<DbClient>,
    Path(id_cam): Path<CameraId>,
) -> ApiResult<impl IntoResponse> {
    let data = db
        .camera_cv_data(id_cam)
        .await?
        .ok_or_else(ApiError::camera_not_found)?;
    Ok(Json(data))
}

/// PATCH /cv/occupancy/{id_parking} - Record a new occupancy
#[utoipa::path(
    patch,
    path = "/cv/occupancy/{id_parking}",
    tag = "CV",
    params(
        ("id_parking" = i32, Path, description = "Parking ID")
    ),
    request_body = OccupancyUpdateRequest,
    responses(
        (status = 200, description = "Occupancy updated", body = MessageResponse),
        (status = 400, description = "Occupancy out of range or store rejected the write", body = ApiError),
        (status = 404, description = "Parking not found", body = ApiError),
    ),
)]
pub async fn update_occupancy(
    State(occupancy): State<OccupancyCache>,
    Path(id_parking): Path<ParkingId>,
    Json(req): Json<OccupancyUpdateRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate()?;

    occupancy
        .update(id_parking, req.occupancy)
        .await
        .map_err(|e| match e {
            StorageError::NotFound { .. } => ApiError::parking_not_found("Parking not found"),
            StorageError::Store { operation, reason } => {
                tracing::error!(parking_id = id_parking, operation = %operation, reason = %reason, "Occupancy write failed");
                ApiError::write_rejected("Failed to update occupancy")
            }
            other => ApiError::from(other),
        })?;

    Ok(Json(MessageResponse {
        message: format!("Occupancy for parking ID {} successfully updated", id_parking),
    }))
}

/// GET /cv/parking/{id_parking}/status - Current occupancy
#[utoipa::path(
    get,
    path = "/cv/parking/{id_parking}/status",
    tag = "CV",
    params(
        ("id_parking" = i32, Path, description = "Parking ID")
    ),
    responses(
        (status = 200, description = "Current occupancy", body = OccupancyRecord),
        (status = 404, description = "Parking not found in cache or DB", body = ApiError),
        (status = 500, description = "Database error", body = ApiError),
    ),
)]
pub async fn get_parking_status(
    State(occupancy): State<OccupancyCache>,
    Path(id_parking): Path<ParkingId>,
) -> ApiResult<impl IntoResponse> {
    let value = occupancy.read(id_parking).await.map_err(|e| match e {
        StorageError::NotFound { .. } => ApiError::parking_not_found("Parking not found in cache or DB"),
        other => ApiError::from(other),
    })?;

    Ok(Json(OccupancyRecord {
        id_parking,
        occupancy: value,
    }))
}

// ============================================================================
// ROUTER SETUP
// ============================================================================

/// Create the CV routes router.
pub fn create_router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/data/:id_cam", axum::routing::get(get_cv_data))
        .route("/occupancy/:id_parking", axum::routing::patch(update_occupancy))
        .route("/parking/:id_parking/status", axum::routing::get(get_parking_status))
}
