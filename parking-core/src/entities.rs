//! Persisted entities and their identifiers.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::error::ValidationError;

// ============================================================================
// IDENTITY TYPES
// ============================================================================

/// Parking identifier (serial primary key).
pub type ParkingId = i32;

/// User identifier (serial primary key).
pub type UserId = i32;

/// Camera identifier (serial primary key).
pub type CameraId = i32;

/// Parking space identifier.
pub type ParkingSpaceId = Uuid;

/// Count of currently occupied spaces at a parking.
pub type Occupancy = u32;

/// Convert a raw integer column into an occupancy value.
pub fn occupancy_from_column(raw: i32) -> Result<Occupancy, ValidationError> {
    Occupancy::try_from(raw).map_err(|_| ValidationError::InvalidValue {
        field: "occupancy".to_string(),
        reason: format!("stored value {} is negative", raw),
    })
}

/// Convert an occupancy value into the integer column representation.
pub fn occupancy_to_column(value: Occupancy) -> Result<i32, ValidationError> {
    i32::try_from(value).map_err(|_| ValidationError::InvalidValue {
        field: "occupancy".to_string(),
        reason: format!("{} exceeds the column range", value),
    })
}

// ============================================================================
// COORDINATES
// ============================================================================

/// WGS84 point as persisted in the jsonb `coordinates` column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Reject non-finite or out-of-range values.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.lat.is_finite() || !(-90.0..=90.0).contains(&self.lat) {
            return Err(ValidationError::InvalidValue {
                field: "coordinates.lat".to_string(),
                reason: format!("{} is outside [-90, 90]", self.lat),
            });
        }
        if !self.lon.is_finite() || !(-180.0..=180.0).contains(&self.lon) {
            return Err(ValidationError::InvalidValue {
                field: "coordinates.lon".to_string(),
                reason: format!("{} is outside [-180, 180]", self.lon),
            });
        }
        Ok(())
    }

    /// Decode a jsonb column value.
    ///
    /// Some rows carry the object serialized as a JSON string instead of a
    /// jsonb object; both shapes are accepted.
    pub fn from_json(value: &JsonValue) -> Result<Self, ValidationError> {
        let invalid = |reason: String| ValidationError::InvalidValue {
            field: "coordinates".to_string(),
            reason,
        };

        match value {
            JsonValue::String(raw) => serde_json::from_str(raw).map_err(|e| invalid(e.to_string())),
            other => serde_json::from_value(other.clone()).map_err(|e| invalid(e.to_string())),
        }
    }

    pub fn to_json(&self) -> JsonValue {
        serde_json::json!({ "lat": self.lat, "lon": self.lon })
    }
}

// ============================================================================
// ENTITIES
// ============================================================================

/// A parking lot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Parking {
    pub id: ParkingId,
    pub description: Option<String>,
    pub coordinates: Coordinates,
    pub name: Option<String>,
    pub name_obj: Option<String>,
    pub adm_area: Option<String>,
    pub district: Option<String>,
    pub occupancy: Option<Occupancy>,
}

/// A single space belonging to a parking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ParkingSpace {
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = Uuid))]
    pub id: ParkingSpaceId,
    pub id_parking: ParkingId,
    pub coordinates: Coordinates,
}

/// A camera feeding computer-vision data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Camera {
    pub id: CameraId,
    pub description: Option<String>,
    #[cfg_attr(feature = "openapi", schema(value_type = Object))]
    pub cv_data: JsonValue,
}

/// A registered user. The password hash never leaves the process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub phone_number: Option<String>,
    #[serde(skip)]
    pub password_hash: String,
    pub subscription_status: bool,
}

/// Link between a user and a parking they marked as favorite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct FavoriteParking {
    pub id: i32,
    pub id_user: UserId,
    pub id_parking: ParkingId,
}

/// Parking summary returned for a user's favorites list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct FavoriteParkingSummary {
    pub id: ParkingId,
    pub name: Option<String>,
    pub coordinates: Coordinates,
}

/// Current occupancy of a parking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct OccupancyRecord {
    pub id_parking: ParkingId,
    pub occupancy: Occupancy,
}

/// Aggregate subscription statistics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UserStats {
    pub total_users: i64,
    pub subscribers: i64,
    pub subscription_share: f64,
}

impl UserStats {
    pub fn new(total_users: i64, subscribers: i64) -> Self {
        let subscription_share = if total_users > 0 {
            subscribers as f64 / total_users as f64
        } else {
            0.0
        };
        Self {
            total_users,
            subscribers,
            subscription_share,
        }
    }
}
