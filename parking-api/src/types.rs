//! API Request and Response Types
//!
//! Wire shapes for the REST endpoints. Persisted entities themselves live in
//! `parking_core` and are returned as-is where the endpoint exposes a whole
//! row.

use parking_core::{
    occupancy_to_column, BoundingBox, CameraId, Coordinates, Occupancy, ParkingId, ParkingSpaceId,
    UserId, ValidationError,
};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use utoipa::{IntoParams, ToSchema};

// ============================================================================
// SHARED
// ============================================================================

/// Plain status body, e.g. `{"status": "System is running"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StatusResponse {
    pub status: String,
}

/// Human-readable confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

/// Confirmation of a delete keyed by an integer id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DeletedResponse {
    pub status: String,
    pub id: i32,
}

impl DeletedResponse {
    pub fn new(id: i32) -> Self {
        Self {
            status: "deleted".to_string(),
            id,
        }
    }
}

/// `?fields=a,b,c` for the projection endpoints.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FieldsQuery {
    /// Comma-separated field names
    pub fields: String,
}

// ============================================================================
// PARKINGS
// ============================================================================

/// Query for parkings inside a bounding box.
#[derive(Debug, Clone, Copy, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AreaQuery {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
}

impl AreaQuery {
    pub fn bounding_box(&self) -> Result<BoundingBox, ValidationError> {
        BoundingBox::new(self.lat_min, self.lat_max, self.lon_min, self.lon_max)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateParkingRequest {
    pub description: Option<String>,
    pub coordinates: Coordinates,
    pub name: Option<String>,
    pub name_obj: Option<String>,
    pub adm_area: Option<String>,
    pub district: Option<String>,
    pub occupancy: Option<Occupancy>,
}

/// Partial parking update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateParkingRequest {
    pub description: Option<String>,
    pub coordinates: Option<Coordinates>,
    pub name: Option<String>,
    pub name_obj: Option<String>,
    pub adm_area: Option<String>,
    pub district: Option<String>,
    pub occupancy: Option<Occupancy>,
}

impl UpdateParkingRequest {
    pub fn is_empty(&self) -> bool {
        self.description.is_none()
            && self.coordinates.is_none()
            && self.name.is_none()
            && self.name_obj.is_none()
            && self.adm_area.is_none()
            && self.district.is_none()
            && self.occupancy.is_none()
    }

    /// Reject values the parkings row cannot hold.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(coordinates) = &self.coordinates {
            coordinates.validate()?;
        }
        if let Some(occupancy) = self.occupancy {
            occupancy_to_column(occupancy)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ParkingCreatedResponse {
    pub id: ParkingId,
    pub name: Option<String>,
    pub coordinates: Coordinates,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ParkingUpdatedResponse {
    pub id: ParkingId,
    pub name: Option<String>,
    pub occupancy: Option<Occupancy>,
}

// ============================================================================
// PARKING SPACES
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateParkingSpaceRequest {
    pub coordinates: Coordinates,
    pub id_parking: ParkingId,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateParkingSpaceRequest {
    pub coordinates: Option<Coordinates>,
}

/// Identity of a parking space after a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ParkingSpaceRef {
    #[schema(value_type = String, format = Uuid)]
    pub id: ParkingSpaceId,
    pub id_parking: ParkingId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ParkingSpaceDeletedResponse {
    #[schema(value_type = String, format = Uuid)]
    pub id: ParkingSpaceId,
}

// ============================================================================
// CAMERAS AND CV
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateCameraRequest {
    pub description: Option<String>,
    #[schema(value_type = Object)]
    pub cv_data: JsonValue,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateCameraRequest {
    pub description: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub cv_data: Option<JsonValue>,
}

impl UpdateCameraRequest {
    pub fn is_empty(&self) -> bool {
        self.description.is_none() && self.cv_data.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CameraDeletedResponse {
    pub id: CameraId,
}

/// Body of `PATCH /cv/occupancy/{id_parking}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct OccupancyUpdateRequest {
    pub occupancy: Occupancy,
}

impl OccupancyUpdateRequest {
    /// The occupancy column is `int4`; anything above `i32::MAX` would reach
    /// the cache and then fail the store write.
    pub fn validate(&self) -> Result<(), ValidationError> {
        occupancy_to_column(self.occupancy).map(|_| ())
    }
}

// ============================================================================
// USERS AND AUTH
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    pub email: String,
    pub phone_number: Option<String>,
    /// Plain-text password; stored as a bcrypt hash.
    #[serde(alias = "password_hash")]
    pub password: String,
    #[serde(default)]
    pub subscription_status: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateUserRequest {
    pub phone_number: Option<String>,
    pub subscription_status: Option<bool>,
}

impl UpdateUserRequest {
    pub fn is_empty(&self) -> bool {
        self.phone_number.is_none() && self.subscription_status.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

// ============================================================================
// FAVORITES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FavoriteRequest {
    pub id_user: UserId,
    pub id_parking: ParkingId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FavoriteCreatedResponse {
    pub id: i32,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_parking_request_empty() -> Result<(), serde_json::Error> {
        let req: UpdateParkingRequest = serde_json::from_str("{}")?;
        assert!(req.is_empty());

        let req: UpdateParkingRequest = serde_json::from_str(r#"{"occupancy": 4}"#)?;
        assert!(!req.is_empty());
        assert_eq!(req.occupancy, Some(4));
        Ok(())
    }

    #[test]
    fn test_negative_occupancy_rejected_at_boundary() {
        let result: Result<OccupancyUpdateRequest, _> =
            serde_json::from_str(r#"{"occupancy": -1}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_create_user_accepts_legacy_password_field() -> Result<(), serde_json::Error> {
        let req: CreateUserRequest =
            serde_json::from_str(r#"{"email": "a@b.c", "password_hash": "pw"}"#)?;
        assert_eq!(req.password, "pw");
        assert!(!req.subscription_status);
        assert!(req.phone_number.is_none());
        Ok(())
    }

    #[test]
    fn test_deleted_response_shape() -> Result<(), serde_json::Error> {
        let json = serde_json::to_value(DeletedResponse::new(5))?;
        assert_eq!(json, serde_json::json!({"status": "deleted", "id": 5}));
        Ok(())
    }

    #[test]
    fn test_area_query_rejects_inverted_box() {
        let query = AreaQuery {
            lat_min: 56.0,
            lat_max: 55.0,
            lon_min: 37.0,
            lon_max: 38.0,
        };
        assert!(query.bounding_box().is_err());
    }

    #[test]
    fn test_occupancy_beyond_column_range_rejected() -> Result<(), serde_json::Error> {
        let req: OccupancyUpdateRequest = serde_json::from_str(r#"{"occupancy": 3000000000}"#)?;
        assert!(req.validate().is_err());

        let req: OccupancyUpdateRequest = serde_json::from_str(r#"{"occupancy": 2147483647}"#)?;
        assert!(req.validate().is_ok());

        let req: UpdateParkingRequest = serde_json::from_str(r#"{"occupancy": 4294967295}"#)?;
        assert!(req.validate().is_err());
        Ok(())
    }

    #[test]
    fn test_update_camera_request_empty() {
        assert!(UpdateCameraRequest::default().is_empty());
        let req = UpdateCameraRequest {
            cv_data: Some(serde_json::json!({"boxes": []})),
            ..Default::default()
        };
        assert!(!req.is_empty());
    }
}
