//! Geographic helpers: bounding-box filters and GeoJSON shaping.

use serde::{Deserialize, Serialize};

use crate::entities::{Coordinates, Occupancy, Parking, ParkingId};
use crate::error::ValidationError;

/// Inclusive latitude/longitude rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct BoundingBox {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
}

impl BoundingBox {
    pub fn new(lat_min: f64, lat_max: f64, lon_min: f64, lon_max: f64) -> Result<Self, ValidationError> {
        let bbox = Self {
            lat_min,
            lat_max,
            lon_min,
            lon_max,
        };
        bbox.validate()?;
        Ok(bbox)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let values = [self.lat_min, self.lat_max, self.lon_min, self.lon_max];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ValidationError::InvalidValue {
                field: "bounding_box".to_string(),
                reason: "bounds must be finite numbers".to_string(),
            });
        }
        if self.lat_min > self.lat_max {
            return Err(ValidationError::InvalidValue {
                field: "lat_min".to_string(),
                reason: format!("{} is greater than lat_max {}", self.lat_min, self.lat_max),
            });
        }
        if self.lon_min > self.lon_max {
            return Err(ValidationError::InvalidValue {
                field: "lon_min".to_string(),
                reason: format!("{} is greater than lon_max {}", self.lon_min, self.lon_max),
            });
        }
        Ok(())
    }

    pub fn contains(&self, point: &Coordinates) -> bool {
        (self.lat_min..=self.lat_max).contains(&point.lat)
            && (self.lon_min..=self.lon_max).contains(&point.lon)
    }
}

/// GeoJSON Point geometry. Coordinates are ordered `[lon, lat]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PointGeometry {
    #[serde(rename = "type")]
    pub kind: String,
    #[cfg_attr(feature = "openapi", schema(value_type = Vec<f64>))]
    pub coordinates: [f64; 2],
}

impl From<Coordinates> for PointGeometry {
    fn from(c: Coordinates) -> Self {
        Self {
            kind: "Point".to_string(),
            coordinates: [c.lon, c.lat],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ParkingProperties {
    pub id: ParkingId,
    pub name: Option<String>,
    pub description: Option<String>,
    pub name_obj: Option<String>,
    pub adm_area: Option<String>,
    pub district: Option<String>,
    pub occupancy: Option<Occupancy>,
}

/// GeoJSON Feature describing a single parking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ParkingFeature {
    #[serde(rename = "type")]
    pub kind: String,
    pub geometry: PointGeometry,
    pub properties: ParkingProperties,
}

impl From<Parking> for ParkingFeature {
    fn from(p: Parking) -> Self {
        Self {
            kind: "Feature".to_string(),
            geometry: PointGeometry::from(p.coordinates),
            properties: ParkingProperties {
                id: p.id,
                name: p.name,
                description: p.description,
                name_obj: p.name_obj,
                adm_area: p.adm_area,
                district: p.district,
                occupancy: p.occupancy,
            },
        }
    }
}
