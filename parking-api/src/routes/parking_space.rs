//! Parking Space REST API Routes

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use parking_core::{ParkingId, ParkingSpace, ParkingSpaceId, ValidationError};

use crate::{
    db::DbClient,
    error::{ApiError, ApiResult},
    state::AppState,
    types::{
        CreateParkingSpaceRequest, ParkingSpaceDeletedResponse, ParkingSpaceRef,
        UpdateParkingSpaceRequest,
    },
};

fn space_not_found() -> ApiError {
    ApiError::not_found("Parking space not found")
}

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// GET /parking_spaces/parking_spaces/all - List all parking spaces
#[utoipa::path(
    get,
    path = "/parking_spaces/parking_spaces/all",
    tag = "Parking Spaces",
    responses(
        (status = 200, description = "All parking spaces", body = Vec<ParkingSpace>),
    ),
)]
pub async fn list_parking_spaces(State(db): State<DbClient>) -> ApiResult<impl IntoResponse> {
    Ok(Json(db.parking_space_list().await?))
}

/// GET /parking_spaces/parking_spaces/by_parking/{parking_id}
#[utoipa::path(
    get,
    path = "/parking_spaces/parking_spaces/by_parking/{parking_id}",
    tag = "Parking Spaces",
    params(
        ("parking_id" = i32, Path, description = "Parking ID")
    ),
    responses(
        (status = 200, description = "Spaces of the parking", body = Vec<ParkingSpace>),
    ),
)]
pub async fn list_spaces_by_parking(
    State(db): State<DbClient>,
    Path(parking_id): Path<ParkingId>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(db.parking_space_list_by_parking(parking_id).await?))
}

/// GET /parking_spaces/parking_space/{id} - Get a parking space
#[utoipa::path(
    get,
    path = "/parking_spaces/parking_space/{id}",
    tag = "Parking Spaces",
    params(
        ("id" = uuid::Uuid, Path, description = "Parking space ID")
    ),
    responses(
        (status = 200, description = "Parking space", body = ParkingSpace),
        (status = 404, description = "Parking space not found", body = ApiError),
    ),
)]
pub async fn get_parking_space(
    State(db): State<DbClient>,
    Path(id): Path<ParkingSpaceId>,
) -> ApiResult<impl IntoResponse> {
    let space = db.parking_space_get(id).await?.ok_or_else(space_not_found)?;
    Ok(Json(space))
}

/// POST /parking_spaces/parking_space - Create a parking space
#[utoipa::path(
    post,
    path = "/parking_spaces/parking_space",
    tag = "Parking Spaces",
    request_body = CreateParkingSpaceRequest,
    responses(
        (status = 201, description = "Parking space created", body = ParkingSpaceRef),
        (status = 404, description = "Parent Parking ID not found", body = ApiError),
    ),
)]
pub async fn create_parking_space(
    State(db): State<DbClient>,
    Json(req): Json<CreateParkingSpaceRequest>,
) -> ApiResult<impl IntoResponse> {
    req.coordinates.validate()?;
    let created = db.parking_space_create(&req).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// PUT /parking_spaces/parking_space/{id} - Move a parking space
#[utoipa::path(
    put,
    path = "/parking_spaces/parking_space/{id}",
    tag = "Parking Spaces",
    params(
        ("id" = uuid::Uuid, Path, description = "Parking space ID")
    ),
    request_body = UpdateParkingSpaceRequest,
    responses(
        (status = 200, description = "Parking space updated", body = ParkingSpaceRef),
        (status = 400, description = "No fields to update", body = ApiError),
        (status = 404, description = "Parking space not found", body = ApiError),
    ),
)]
pub async fn update_parking_space(
    State(db): State<DbClient>,
    Path(id): Path<ParkingSpaceId>,
    Json(req): Json<UpdateParkingSpaceRequest>,
) -> ApiResult<impl IntoResponse> {
    let coordinates = req.coordinates.ok_or(ValidationError::EmptyUpdate)?;
    coordinates.validate()?;
    let updated = db
        .parking_space_update(id, &coordinates)
        .await?
        .ok_or_else(space_not_found)?;
    Ok(Json(updated))
}

/// DELETE /parking_spaces/parking_space/{id} - Delete a parking space
#[utoipa::path(
    delete,
    path = "/parking_spaces/parking_space/{id}",
    tag = "Parking Spaces",
    params(
        ("id" = uuid::Uuid, Path, description = "Parking space ID")
    ),
    responses(
        (status = 200, description = "Parking space deleted", body = ParkingSpaceDeletedResponse),
        (status = 404, description = "Parking space not found", body = ApiError),
    ),
)]
pub async fn delete_parking_space(
    State(db): State<DbClient>,
    Path(id): Path<ParkingSpaceId>,
) -> ApiResult<impl IntoResponse> {
    let id = db.parking_space_delete(id).await?.ok_or_else(space_not_found)?;
    Ok(Json(ParkingSpaceDeletedResponse { id }))
}

// ============================================================================
// ROUTER SETUP
// ============================================================================

/// Create the parking space routes router.
pub fn create_router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/parking_spaces/all", axum::routing::get(list_parking_spaces))
        .route(
            "/parking_spaces/by_parking/:parking_id",
            axum::routing::get(list_spaces_by_parking),
        )
        .route("/parking_space", axum::routing::post(create_parking_space))
        .route(
            "/parking_space/:id",
            axum::routing::get(get_parking_space)
                .put(update_parking_space)
                .delete(delete_parking_space),
        )
}
