//! Parking REST API Routes
//!
//! CRUD, area search, field projection and GeoJSON output for parkings.
//! A PUT that carries an occupancy also refreshes the occupancy cache entry
//! so the CV status endpoint never serves a value older than the last write.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use parking_core::{FieldSelection, Parking, ParkingFeature, ParkingId};
use parking_storage::OccupancyCache;
use serde_json::Value as JsonValue;

use crate::{
    db::DbClient,
    error::{ApiError, ApiResult},
    state::AppState,
    types::{
        AreaQuery, CreateParkingRequest, DeletedResponse, FieldsQuery, ParkingCreatedResponse,
        ParkingUpdatedResponse, UpdateParkingRequest,
    },
};

fn parking_not_found() -> ApiError {
    ApiError::parking_not_found("Parking not found")
}

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// GET /api/parkings/all - List all parkings
#[utoipa::path(
    get,
    path = "/api/parkings/all",
    tag = "Parkings",
    responses(
        (status = 200, description = "All parkings", body = Vec<Parking>),
    ),
)]
pub async fn list_parkings(State(db): State<DbClient>) -> ApiResult<impl IntoResponse> {
    let parkings = db.parking_list().await?;
    Ok(Json(parkings))
}

/// GET /api/parkings/in_area - Parkings inside a bounding box
#[utoipa::path(
    get,
    path = "/api/parkings/in_area",
    tag = "Parkings",
    params(AreaQuery),
    responses(
        (status = 200, description = "Parkings inside the box", body = Vec<Parking>),
        (status = 400, description = "Invalid bounding box", body = ApiError),
    ),
)]
pub async fn list_parkings_in_area(
    State(db): State<DbClient>,
    Query(query): Query<AreaQuery>,
) -> ApiResult<impl IntoResponse> {
    let parkings = db.parking_list_in_area(&query).await?;
    Ok(Json(parkings))
}

/// GET /api/parking/{id} - Get parking by ID
#[utoipa::path(
    get,
    path = "/api/parking/{id}",
    tag = "Parkings",
    params(
        ("id" = i32, Path, description = "Parking ID")
    ),
    responses(
        (status = 200, description = "Parking details", body = Parking),
        (status = 404, description = "Parking not found", body = ApiError),
    ),
)]
pub async fn get_parking(
    State(db): State<DbClient>,
    Path(id): Path<ParkingId>,
) -> ApiResult<impl IntoResponse> {
    let parking = db.parking_get(id).await?.ok_or_else(parking_not_found)?;
    Ok(Json(parking))
}

/// GET /api/parking_fields/{id} - Selected fields of a parking
#[utoipa::path(
    get,
    path = "/api/parking_fields/{id}",
    tag = "Parkings",
    params(
        ("id" = i32, Path, description = "Parking ID"),
        FieldsQuery,
    ),
    responses(
        (status = 200, description = "Requested fields only", body = Object),
        (status = 400, description = "Unknown field requested", body = ApiError),
        (status = 404, description = "Parking not found", body = ApiError),
    ),
)]
pub async fn get_parking_fields(
    State(db): State<DbClient>,
    Path(id): Path<ParkingId>,
    Query(query): Query<FieldsQuery>,
) -> ApiResult<impl IntoResponse> {
    let selection = FieldSelection::parse::<Parking>(&query.fields)?;
    let parking = db.parking_get(id).await?.ok_or_else(parking_not_found)?;
    let projected = selection.project(&parking)?;
    Ok(Json(JsonValue::Object(projected)))
}

/// GET /api/parkinggeojson/{id} - Parking as a GeoJSON Feature
#[utoipa::path(
    get,
    path = "/api/parkinggeojson/{id}",
    tag = "Parkings",
    params(
        ("id" = i32, Path, description = "Parking ID")
    ),
    responses(
        (status = 200, description = "GeoJSON Feature", body = ParkingFeature),
        (status = 404, description = "Parking not found", body = ApiError),
    ),
)]
pub async fn get_parking_geojson(
    State(db): State<DbClient>,
    Path(id): Path<ParkingId>,
) -> ApiResult<impl IntoResponse> {
    let parking = db.parking_get(id).await?.ok_or_else(parking_not_found)?;
    Ok(Json(ParkingFeature::from(parking)))
}

/// POST /api/parkings - Create a parking
#[utoipa::path(
    post,
    path = "/api/parkings",
    tag = "Parkings",
    request_body = CreateParkingRequest,
    responses(
        (status = 201, description = "Parking created", body = ParkingCreatedResponse),
        (status = 400, description = "Invalid request", body = ApiError),
    ),
)]
pub async fn create_parking(
    State(db): State<DbClient>,
    Json(req): Json<CreateParkingRequest>,
) -> ApiResult<impl IntoResponse> {
    req.coordinates.validate()?;
    let created = db.parking_create(&req).await?;
    tracing::info!(parking_id = created.id, "Parking created");
    Ok((StatusCode::CREATED, Json(created)))
}

/// PUT /api/parking/{id} - Partially update a parking
#[utoipa::path(
    put,
    path = "/api/parking/{id}",
    tag = "Parkings",
    params(
        ("id" = i32, Path, description = "Parking ID")
    ),
    request_body = UpdateParkingRequest,
    responses(
        (status = 200, description = "Parking updated", body = ParkingUpdatedResponse),
        (status = 400, description = "No fields to update", body = ApiError),
        (status = 404, description = "Parking not found", body = ApiError),
    ),
)]
pub async fn update_parking(
    State(db): State<DbClient>,
    State(occupancy): State<OccupancyCache>,
    Path(id): Path<ParkingId>,
    Json(req): Json<UpdateParkingRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate()?;

    let updated: ParkingUpdatedResponse = db
        .parking_update(id, &req)
        .await?
        .ok_or_else(parking_not_found)?;

    refresh_cached_occupancy(&occupancy, &req, &updated).await;

    Ok(Json(updated))
}

/// Push the occupancy written by a PUT into the cache. Only writes that
/// carried an occupancy and came back with a non-null value touch the cache.
pub(crate) async fn refresh_cached_occupancy(
    occupancy: &OccupancyCache,
    req: &UpdateParkingRequest,
    updated: &ParkingUpdatedResponse,
) {
    if let (Some(_), Some(value)) = (req.occupancy, updated.occupancy) {
        occupancy.refresh(updated.id, value).await;
        tracing::debug!(parking_id = updated.id, occupancy = value, "Occupancy cache refreshed");
    }
}

/// DELETE /api/parking/{id} - Delete a parking
#[utoipa::path(
    delete,
    path = "/api/parking/{id}",
    tag = "Parkings",
    params(
        ("id" = i32, Path, description = "Parking ID")
    ),
    responses(
        (status = 200, description = "Parking deleted", body = DeletedResponse),
        (status = 404, description = "Parking not found", body = ApiError),
    ),
)]
pub async fn delete_parking(
    State(db): State<DbClient>,
    Path(id): Path<ParkingId>,
) -> ApiResult<impl IntoResponse> {
    let deleted = db.parking_delete(id).await?.ok_or_else(parking_not_found)?;
    tracing::info!(parking_id = deleted, "Parking deleted");
    Ok(Json(DeletedResponse::new(deleted)))
}

// ============================================================================
// ROUTER SETUP
// ============================================================================

/// Create the parking routes router.
pub fn create_router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/parkings/all", axum::routing::get(list_parkings))
        .route("/parkings/in_area", axum::routing::get(list_parkings_in_area))
        .route("/parkings", axum::routing::post(create_parking))
        .route(
            "/parking/:id",
            axum::routing::get(get_parking)
                .put(update_parking)
                .delete(delete_parking),
        )
        .route("/parking_fields/:id", axum::routing::get(get_parking_fields))
        .route("/parkinggeojson/:id", axum::routing::get(get_parking_geojson))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::harness;
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    async fn status_of(request: Request<Body>) -> Result<StatusCode, String> {
        let app = create_router().with_state(harness().state);
        let response = app
            .oneshot(request)
            .await
            .map_err(|e| format!("Request failed: {:?}", e))?;
        Ok(response.status())
    }

    #[tokio::test]
    async fn test_unknown_projection_field_rejected() -> Result<(), String> {
        let request = Request::builder()
            .uri("/parking_fields/1?fields=name,password_hash")
            .body(Body::empty())
            .map_err(|e| e.to_string())?;
        assert_eq!(status_of(request).await?, StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn test_inverted_area_rejected() -> Result<(), String> {
        let request = Request::builder()
            .uri("/parkings/in_area?lat_min=56&lat_max=55&lon_min=37&lon_max=38")
            .body(Body::empty())
            .map_err(|e| e.to_string())?;
        assert_eq!(status_of(request).await?, StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn test_empty_update_rejected() -> Result<(), String> {
        let request = Request::builder()
            .method("PUT")
            .uri("/parking/1")
            .header("content-type", "application/json")
            .body(Body::from("{}"))
            .map_err(|e| e.to_string())?;
        assert_eq!(status_of(request).await?, StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_rejects_occupancy_beyond_column() -> Result<(), String> {
        let request = Request::builder()
            .method("PUT")
            .uri("/parking/1")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"occupancy": 3000000000}"#))
            .map_err(|e| e.to_string())?;
        assert_eq!(status_of(request).await?, StatusCode::BAD_REQUEST);
        Ok(())
    }

    fn updated(id: ParkingId, occupancy: Option<u32>) -> ParkingUpdatedResponse {
        ParkingUpdatedResponse {
            id,
            name: None,
            occupancy,
        }
    }

    #[tokio::test]
    async fn test_put_with_occupancy_refreshes_cache() -> Result<(), String> {
        let h = harness();
        h.cache.insert_raw("parking:4:occupancy", "1");
        let req = UpdateParkingRequest {
            occupancy: Some(9),
            ..Default::default()
        };

        refresh_cached_occupancy(&h.state.occupancy, &req, &updated(4, Some(9))).await;

        assert_eq!(h.cache.peek("parking:4:occupancy").as_deref(), Some("9"));
        let read = h.state.occupancy.read(4).await.map_err(|e| e.to_string())?;
        assert_eq!(read, 9);
        assert_eq!(h.store.read_count(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_put_without_occupancy_leaves_cache_alone() {
        let h = harness();
        h.cache.insert_raw("parking:4:occupancy", "1");
        let req = UpdateParkingRequest {
            name: Some("Renamed".to_string()),
            ..Default::default()
        };

        refresh_cached_occupancy(&h.state.occupancy, &req, &updated(4, Some(1))).await;

        let req = UpdateParkingRequest {
            occupancy: Some(2),
            ..Default::default()
        };
        refresh_cached_occupancy(&h.state.occupancy, &req, &updated(5, None)).await;

        assert_eq!(h.cache.peek("parking:4:occupancy").as_deref(), Some("1"));
        assert_eq!(h.cache.peek("parking:5:occupancy"), None);
    }

    #[tokio::test]
    async fn test_create_rejects_out_of_range_coordinates() -> Result<(), String> {
        let request = Request::builder()
            .method("POST")
            .uri("/parkings")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"description": "lot", "coordinates": {"lat": 95.0, "lon": 37.6}}"#))
            .map_err(|e| e.to_string())?;
        assert_eq!(status_of(request).await?, StatusCode::BAD_REQUEST);
        Ok(())
    }
}
