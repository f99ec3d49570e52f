//! Health Check Endpoints
//!
//! - /health/ping - Simple liveness check
//! - /health/live - Process alive check
//! - /health/ready - Database and occupancy cache check
//!
//! The occupancy path tolerates cache outages, so an unreachable cache only
//! degrades readiness; an unreachable database fails it.
//!
//! No authentication required for health endpoints.

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use parking_storage::OccupancyCache;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use utoipa::ToSchema;

use crate::db::DbClient;

// ============================================================================
// TYPES
// ============================================================================

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HealthDetails>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
    Degraded,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthDetails {
    pub database: ComponentHealth,
    pub cache: ComponentHealth,
    pub version: String,
    pub uptime_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ComponentHealth {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ComponentHealth {
    fn from_check(result: Result<u64, String>, backend: Option<&str>) -> Self {
        let backend = backend.map(str::to_string);
        match result {
            Ok(latency) => Self {
                status: HealthStatus::Healthy,
                backend,
                latency_ms: Some(latency),
                error: None,
            },
            Err(e) => Self {
                status: HealthStatus::Unhealthy,
                backend,
                latency_ms: None,
                error: Some(e),
            },
        }
    }
}

/// Overall status: the database gates readiness, the cache only degrades it.
pub fn overall_status(database: HealthStatus, cache: HealthStatus) -> HealthStatus {
    match (database, cache) {
        (HealthStatus::Healthy, HealthStatus::Healthy) => HealthStatus::Healthy,
        (HealthStatus::Healthy, _) => HealthStatus::Degraded,
        _ => HealthStatus::Unhealthy,
    }
}

// ============================================================================
// STATE
// ============================================================================

#[derive(Clone)]
pub struct HealthState {
    pub db: DbClient,
    pub occupancy: OccupancyCache,
    pub start_time: Instant,
}

impl HealthState {
    pub fn new(db: DbClient, occupancy: OccupancyCache, start_time: Instant) -> Self {
        Self {
            db,
            occupancy,
            start_time,
        }
    }
}

// ============================================================================
// HANDLERS
// ============================================================================

/// GET /health/ping - Simple pong response
#[utoipa::path(
    get,
    path = "/health/ping",
    tag = "Health",
    responses(
        (status = 200, description = "Service is responding", body = String),
    ),
)]
pub async fn ping() -> impl IntoResponse {
    (StatusCode::OK, "pong")
}

/// GET /health/live - Process liveness check
#[utoipa::path(
    get,
    path = "/health/live",
    tag = "Health",
    responses(
        (status = 200, description = "Process is alive", body = HealthResponse),
    ),
)]
pub async fn liveness() -> impl IntoResponse {
    let response = HealthResponse {
        status: HealthStatus::Healthy,
        message: Some("Process is alive".to_string()),
        details: None,
    };
    (StatusCode::OK, Json(response))
}

/// GET /health/ready - Readiness check
#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Service is ready or degraded", body = HealthResponse),
        (status = 503, description = "Service is not ready", body = HealthResponse),
    ),
)]
pub async fn readiness(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    let database = ComponentHealth::from_check(check_database(&state.db).await, None);
    let cache = ComponentHealth::from_check(
        check_cache(&state.occupancy).await,
        Some(state.occupancy.backend_name()),
    );

    let status = overall_status(database.status, cache.status);
    let response = HealthResponse {
        status,
        message: None,
        details: Some(HealthDetails {
            database,
            cache,
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: state.start_time.elapsed().as_secs(),
        }),
    };

    let status_code = if status == HealthStatus::Unhealthy {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    (status_code, Json(response))
}

async fn check_database(db: &DbClient) -> Result<u64, String> {
    let start = Instant::now();
    match db.health_check().await {
        Ok(_) => Ok(start.elapsed().as_millis() as u64),
        Err(e) => Err(format!("Database check failed: {}", e.message)),
    }
}

async fn check_cache(occupancy: &OccupancyCache) -> Result<u64, String> {
    let start = Instant::now();
    match occupancy.cache_health().await {
        Ok(_) => Ok(start.elapsed().as_millis() as u64),
        Err(e) => Err(format!("Cache check failed: {}", e)),
    }
}

// ============================================================================
// ROUTER
// ============================================================================

/// Create health check router (no auth required)
pub fn create_router(db: DbClient, occupancy: OccupancyCache, start_time: Instant) -> Router {
    let state = Arc::new(HealthState::new(db, occupancy, start_time));

    Router::new()
        .route("/ping", get(ping))
        .route("/live", get(liveness))
        .route("/ready", get(readiness))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_response_serialization() -> Result<(), serde_json::Error> {
        let response = HealthResponse {
            status: HealthStatus::Healthy,
            message: Some("All systems operational".to_string()),
            details: None,
        };

        let json = serde_json::to_string(&response)?;
        assert!(json.contains("\"status\":\"healthy\""));
        assert!(!json.contains("details"));
        Ok(())
    }

    #[test]
    fn test_overall_status() {
        use HealthStatus::*;
        assert_eq!(overall_status(Healthy, Healthy), Healthy);
        assert_eq!(overall_status(Healthy, Unhealthy), Degraded);
        assert_eq!(overall_status(Unhealthy, Healthy), Unhealthy);
        assert_eq!(overall_status(Unhealthy, Unhealthy), Unhealthy);
    }

    #[test]
    fn test_component_health_with_error() -> Result<(), serde_json::Error> {
        let component =
            ComponentHealth::from_check(Err("Connection refused".to_string()), Some("redis"));

        let json = serde_json::to_string(&component)?;
        assert!(json.contains("\"status\":\"unhealthy\""));
        assert!(json.contains("\"backend\":\"redis\""));
        assert!(json.contains("Connection refused"));
        assert!(!json.contains("latency_ms"));
        Ok(())
    }
}
