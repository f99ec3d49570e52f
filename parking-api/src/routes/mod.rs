//! REST API Routes Module
//!
//! Route handlers organized by resource, plus the router assembly:
//! - Parkings, users and auth under `/api`
//! - Parking spaces under `/parking_spaces`
//! - Cameras and CV occupancy under `/cv`
//! - Favorites under `/favorite_parkings` (bearer token required)
//! - Health checks, metrics and the OpenAPI document at the root

pub mod auth;
pub mod camera;
pub mod cv;
pub mod favorite;
pub mod health;
pub mod parking;
pub mod parking_space;
pub mod user;

use std::time::Duration;

use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{from_fn, from_fn_with_state},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use utoipa::OpenApi;

use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};
use crate::middleware::{auth_middleware, AuthMiddlewareState};
use crate::openapi::ApiDoc;
use crate::state::AppState;
use crate::telemetry::{metrics_handler, observability_middleware};
use crate::types::StatusResponse;

// Re-export route creation functions for convenience
pub use auth::create_router as auth_router;
pub use camera::create_router as camera_router;
pub use cv::create_router as cv_router;
pub use favorite::create_router as favorite_router;
pub use health::create_router as health_router;
pub use parking::create_router as parking_router;
pub use parking_space::create_router as parking_space_router;
pub use user::create_router as user_router;

// ============================================================================
// ROOT AND OPENAPI ENDPOINTS
// ============================================================================

/// GET / - Service banner
async fn root() -> impl IntoResponse {
    Json(StatusResponse {
        status: "System is running".to_string(),
    })
}

/// Handler for /openapi.json endpoint.
async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

// ============================================================================
// PRODUCTION VALIDATION
// ============================================================================

/// Check if running in a production environment.
fn is_production_environment() -> bool {
    std::env::var("PARKING_ENVIRONMENT")
        .map(|e| matches!(e.to_lowercase().as_str(), "production" | "prod"))
        .unwrap_or(false)
}

/// Validate API configuration for production use.
fn validate_api_config_for_production(config: &ApiConfig) -> ApiResult<()> {
    if config.cors_origins.is_empty() {
        return Err(ApiError::invalid_input(
            "CORS origins not configured for production. Set PARKING_CORS_ORIGINS.",
        ));
    }
    Ok(())
}

// ============================================================================
// SECURE ROUTER BUILDER
// ============================================================================

/// Builder for the complete application router.
///
/// Favorites are protected by the bearer-token middleware; every route gets
/// observability, request tracing, a request timeout and CORS.
pub struct SecureRouterBuilder {
    state: AppState,
    api_config: ApiConfig,
    auth_state: AuthMiddlewareState,
}

impl SecureRouterBuilder {
    /// Create a new SecureRouterBuilder.
    ///
    /// In production this refuses insecure JWT and CORS settings.
    pub fn new(state: AppState, api_config: ApiConfig) -> ApiResult<Self> {
        state.auth.validate_for_production()?;
        if is_production_environment() {
            validate_api_config_for_production(&api_config)?;
        }

        Ok(Self::without_validation(state, api_config))
    }

    fn without_validation(state: AppState, api_config: ApiConfig) -> Self {
        let auth_state = AuthMiddlewareState::new(state.auth.clone());
        Self {
            state,
            api_config,
            auth_state,
        }
    }

    /// Routes mounted under `/api`.
    fn build_api_routes(&self) -> Router<AppState> {
        Router::new()
            .merge(parking_router())
            .merge(user_router())
            .merge(auth_router())
    }

    /// Build the complete router.
    ///
    /// # Middleware Order (outer to inner)
    /// 1. CORS (outermost) - handles preflight requests
    /// 2. Observability - tracing span and metrics
    /// 3. HTTP trace layer
    /// 4. Request timeout
    /// 5. Auth (only on /favorite_parkings/*)
    pub fn build(self) -> ApiResult<Router> {
        let favorites =
            favorite_router().layer(from_fn_with_state(self.auth_state.clone(), auth_middleware));

        let cv = camera_router().merge(cv_router());

        let router = Router::new()
            .route("/", get(root))
            .nest("/api", self.build_api_routes())
            .nest("/parking_spaces", parking_space_router())
            .nest("/cv", cv)
            .nest("/favorite_parkings", favorites)
            .route("/metrics", get(metrics_handler))
            .route("/openapi.json", get(openapi_json))
            .with_state(self.state.clone())
            .nest(
                "/health",
                health_router(
                    self.state.db.clone(),
                    self.state.occupancy.clone(),
                    self.state.start_time,
                ),
            );

        let cors = build_cors_layer(&self.api_config);

        Ok(router
            .layer(timeout_layer(&self.api_config))
            .layer(TraceLayer::new_for_http())
            .layer(from_fn(observability_middleware))
            .layer(cors))
    }
}

/// Requests running past `request_timeout` are answered with 408.
fn timeout_layer(config: &ApiConfig) -> TimeoutLayer {
    TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, config.request_timeout)
}

// ============================================================================
// CORS LAYER
// ============================================================================

/// Build the CORS layer from ApiConfig.
///
/// In development mode (empty origins), allows all origins.
/// In production mode, only allows configured origins.
fn build_cors_layer(config: &ApiConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .max_age(Duration::from_secs(config.cors_max_age_secs));

    if config.cors_origins.is_empty() {
        tracing::info!("CORS: Development mode - allowing all origins");
        cors.allow_origin(Any).allow_headers(Any).expose_headers(Any)
    } else {
        tracing::info!(
            "CORS: Production mode - allowing origins: {:?}",
            config.cors_origins
        );
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();

        if config.cors_allow_credentials {
            cors.allow_origin(origins).allow_credentials(true)
        } else {
            cors.allow_origin(origins)
        }
    }
}

/// Create the complete API router.
pub fn create_api_router(state: AppState, api_config: &ApiConfig) -> ApiResult<Router> {
    SecureRouterBuilder::new(state, api_config.clone()).and_then(|builder| builder.build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::harness;
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    // Skips the production checks so env changes made by other tests cannot
    // interfere.
    fn app_for(state: AppState) -> Result<Router, String> {
        SecureRouterBuilder::without_validation(state, ApiConfig::default())
            .build()
            .map_err(|e| e.message)
    }

    fn app() -> Result<Router, String> {
        app_for(harness().state)
    }

    async fn get_body(app: Router, uri: &str) -> Result<(StatusCode, Vec<u8>), String> {
        let request = Request::builder()
            .uri(uri)
            .body(Body::empty())
            .map_err(|e| e.to_string())?;
        let response = app
            .oneshot(request)
            .await
            .map_err(|e| format!("Request failed: {:?}", e))?;
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .map_err(|e| e.to_string())?;
        Ok((status, body.to_vec()))
    }

    #[tokio::test]
    async fn test_root_banner() -> Result<(), String> {
        let (status, body) = get_body(app()?, "/").await?;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_slice(&body).map_err(|e| e.to_string())?;
        assert_eq!(json["status"], "System is running");
        Ok(())
    }

    #[tokio::test]
    async fn test_health_ping_is_public() -> Result<(), String> {
        let (status, body) = get_body(app()?, "/health/ping").await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"pong");
        Ok(())
    }

    #[tokio::test]
    async fn test_favorites_require_token() -> Result<(), String> {
        let (status, _) = get_body(app()?, "/favorite_parkings/favorites/1").await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        Ok(())
    }

    #[tokio::test]
    async fn test_occupancy_status_is_mounted_under_cv() -> Result<(), String> {
        let h = harness();
        h.cache.insert_raw("parking:11:occupancy", "6");
        let app = app_for(h.state)?;

        let (status, body) = get_body(app, "/cv/parking/11/status").await?;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_slice(&body).map_err(|e| e.to_string())?;
        assert_eq!(json["occupancy"], 6);
        Ok(())
    }

    #[tokio::test]
    async fn test_openapi_document_served() -> Result<(), String> {
        let (status, body) = get_body(app()?, "/openapi.json").await?;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_slice(&body).map_err(|e| e.to_string())?;
        assert_eq!(json["info"]["title"], "Parkings API");
        Ok(())
    }

    #[tokio::test]
    async fn test_slow_handler_times_out_with_408() -> Result<(), String> {
        let config = ApiConfig {
            request_timeout: Duration::from_millis(20),
            ..Default::default()
        };
        let slow = Router::new()
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    "done"
                }),
            )
            .layer(timeout_layer(&config));

        let (status, _) = get_body(slow, "/slow").await?;
        assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
        Ok(())
    }

    #[test]
    fn test_production_requires_cors_origins() {
        assert!(validate_api_config_for_production(&ApiConfig::default()).is_err());
        let config = ApiConfig {
            cors_origins: vec!["https://parkings.app".to_string()],
            ..Default::default()
        };
        assert!(validate_api_config_for_production(&config).is_ok());
    }
}
