//! OpenAPI Specification Generation
//!
//! Collects every annotated handler and wire schema into a single document,
//! served at `/openapi.json`.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::auth::TokenPair;
use crate::error::{ApiError, ErrorCode};
use crate::routes::health::{ComponentHealth, HealthDetails, HealthResponse, HealthStatus};
use crate::routes::{auth, camera, cv, favorite, health, parking, parking_space, user};
use crate::types::*;
use parking_core::{
    Camera, Coordinates, FavoriteParkingSummary, OccupancyRecord, Parking, ParkingFeature,
    ParkingProperties, ParkingSpace, PointGeometry, User, UserStats,
};

/// OpenAPI document for the parkings REST API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Parkings API",
        version = "0.3.0",
        description = "Parking lots, parking spaces, cameras and live occupancy for the parkings platform",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:8000", description = "Local Development")
    ),
    tags(
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Observability", description = "Prometheus metrics"),
        (name = "Parkings", description = "Parking lots, area search and GeoJSON"),
        (name = "Parking Spaces", description = "Individual spaces inside a parking"),
        (name = "Cameras", description = "Cameras and their computer-vision payloads"),
        (name = "CV", description = "Occupancy ingestion and lookup"),
        (name = "Users", description = "User accounts"),
        (name = "Auth", description = "Token issuance and refresh"),
        (name = "Favorites", description = "A user's favorite parkings")
    ),
    paths(
        // === Health ===
        health::ping,
        health::liveness,
        health::readiness,
        crate::telemetry::metrics::metrics_handler,

        // === Parkings ===
        parking::list_parkings,
        parking::list_parkings_in_area,
        parking::get_parking,
        parking::get_parking_fields,
        parking::get_parking_geojson,
        parking::create_parking,
        parking::update_parking,
        parking::delete_parking,

        // === Parking Spaces ===
        parking_space::list_parking_spaces,
        parking_space::list_spaces_by_parking,
        parking_space::get_parking_space,
        parking_space::create_parking_space,
        parking_space::update_parking_space,
        parking_space::delete_parking_space,

        // === Cameras and CV ===
        camera::list_cameras,
        camera::get_camera,
        camera::create_camera,
        camera::update_camera,
        camera::delete_camera,
        cv::get_cv_data,
        cv::update_occupancy,
        cv::get_parking_status,

        // === Users and Auth ===
        user::list_users,
        user::user_stats,
        user::get_user,
        user::get_user_fields,
        user::create_user,
        user::update_user,
        user::delete_user,
        auth::login,
        auth::refresh,

        // === Favorites ===
        favorite::list_favorites,
        favorite::add_favorite,
        favorite::remove_favorite,
    ),
    components(
        schemas(
            ApiError, ErrorCode, TokenPair,
            HealthResponse, HealthStatus, HealthDetails, ComponentHealth,

            StatusResponse, MessageResponse, DeletedResponse,
            CreateParkingRequest, UpdateParkingRequest,
            ParkingCreatedResponse, ParkingUpdatedResponse,
            CreateParkingSpaceRequest, UpdateParkingSpaceRequest,
            ParkingSpaceRef, ParkingSpaceDeletedResponse,
            CreateCameraRequest, UpdateCameraRequest, CameraDeletedResponse,
            OccupancyUpdateRequest,
            CreateUserRequest, UpdateUserRequest, LoginRequest, RefreshRequest,
            FavoriteRequest, FavoriteCreatedResponse,

            Coordinates, Parking, ParkingSpace, Camera, User, UserStats,
            FavoriteParkingSummary, OccupancyRecord,
            ParkingFeature, PointGeometry, ParkingProperties,
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Access token from /api/auth/login"))
                        .build(),
                ),
            );
        }
    }
}

impl ApiDoc {
    /// Generate OpenAPI spec as JSON string.
    pub fn to_json() -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Self::openapi())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_info() {
        let spec = ApiDoc::openapi();
        assert_eq!(spec.info.title, "Parkings API");
        assert!(spec.servers.is_some_and(|s| !s.is_empty()));
    }

    #[test]
    fn test_openapi_tags() -> Result<(), String> {
        let spec = ApiDoc::openapi();
        let tags = spec.tags.ok_or("OpenAPI spec should have tags")?;
        let names: Vec<&str> = tags.iter().map(|t| t.name.as_str()).collect();
        for expected in ["Parkings", "CV", "Favorites", "Health"] {
            assert!(names.contains(&expected), "missing tag {expected}");
        }
        Ok(())
    }

    #[test]
    fn test_security_scheme_registered() -> Result<(), String> {
        let spec = ApiDoc::openapi();
        let components = spec.components.ok_or("OpenAPI spec should have components")?;
        assert!(components.security_schemes.contains_key("bearer_auth"));
        Ok(())
    }

    #[test]
    fn test_occupancy_paths_documented() -> Result<(), String> {
        let json = ApiDoc::to_json().map_err(|e| e.to_string())?;
        let value: serde_json::Value = serde_json::from_str(&json).map_err(|e| e.to_string())?;
        let paths = value["paths"].as_object().ok_or("paths should be an object")?;
        assert!(paths.contains_key("/cv/occupancy/{id_parking}"));
        assert!(paths.contains_key("/cv/parking/{id_parking}/status"));
        assert!(paths.contains_key("/metrics"));
        Ok(())
    }

    #[test]
    fn test_parking_space_ids_documented_as_uuid() -> Result<(), String> {
        let json = ApiDoc::to_json().map_err(|e| e.to_string())?;
        let value: serde_json::Value = serde_json::from_str(&json).map_err(|e| e.to_string())?;
        let schemas = &value["components"]["schemas"];
        for schema in ["ParkingSpace", "ParkingSpaceRef", "ParkingSpaceDeletedResponse"] {
            let id = &schemas[schema]["properties"]["id"];
            assert_eq!(id["type"], "string", "{schema}.id type");
            assert_eq!(id["format"], "uuid", "{schema}.id format");
        }
        Ok(())
    }
}
