//! Parkings API Server Entry Point
//!
//! Bootstraps configuration, wires the occupancy cache to Redis (or the
//! in-process cache) and the database, and starts the Axum HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use parking_api::telemetry::{init_tracing, TelemetryConfig};
use parking_api::{
    create_api_router, ApiConfig, ApiError, ApiResult, AppState, AuthConfig, CacheSettings,
    DbClient, DbConfig,
};
use parking_storage::{CacheClient, OccupancyCache, RedisCache};

#[tokio::main]
async fn main() -> ApiResult<()> {
    let telemetry_config = TelemetryConfig::from_env();
    init_tracing(&telemetry_config)?;

    let db_config = DbConfig::from_env();
    let db = DbClient::from_config(&db_config)?;

    let cache_settings = CacheSettings::from_env();
    let cache = open_cache(&cache_settings)?;
    let occupancy = OccupancyCache::new(cache, Arc::new(db.clone()), cache_settings.cache_config());
    tracing::info!(backend = occupancy.backend_name(), "Occupancy cache ready");

    let api_config = ApiConfig::from_env();
    let auth_config = Arc::new(AuthConfig::from_env());

    let state = AppState::new(db, occupancy, auth_config);
    let app: Router = create_api_router(state, &api_config)?;

    let addr = resolve_bind_addr()?;
    tracing::info!(%addr, service = %telemetry_config.service_name, "Starting parkings API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}

/// The Redis connection is established lazily, so an unreachable server
/// only shows up as cache misses and a degraded readiness probe.
fn open_cache(settings: &CacheSettings) -> ApiResult<Arc<dyn CacheClient>> {
    match settings.redis_url.as_deref() {
        Some(url) => {
            let cache = RedisCache::open(url).map_err(|e| {
                ApiError::invalid_input(format!("Invalid REDIS_URL: {}", e))
            })?;
            Ok(Arc::new(cache))
        }
        None => {
            tracing::warn!(
                max_entries = settings.memory_max_entries,
                "REDIS_URL disabled; occupancy is cached in-process only"
            );
            Ok(Arc::new(settings.memory_cache()))
        }
    }
}

fn resolve_bind_addr() -> ApiResult<SocketAddr> {
    let host = std::env::var("PARKING_API_BIND").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port_str = std::env::var("PORT")
        .ok()
        .or_else(|| std::env::var("PARKING_API_PORT").ok())
        .unwrap_or_else(|| "8000".to_string());
    let port = port_str
        .parse::<u16>()
        .map_err(|_| ApiError::invalid_input(format!("Invalid port value: {}", port_str)))?;

    let addr = format!("{}:{}", host, port);
    addr.parse::<SocketAddr>()
        .map_err(|e| ApiError::invalid_input(format!("Invalid bind address {}: {}", addr, e)))
}
