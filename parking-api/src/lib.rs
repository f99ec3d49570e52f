//! Parkings API - REST Layer
//!
//! Axum HTTP surface over the parkings PostgreSQL schema. Live occupancy is
//! served through the cache-aside [`OccupancyCache`] from `parking-storage`,
//! backed by Redis in production and by the in-process cache in tests.

pub mod macros;

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;
pub mod telemetry;
pub mod types;

// Re-export commonly used types
pub use auth::{
    authenticate_bearer, hash_password, issue_token_pair, validate_token, verify_password,
    AuthConfig, AuthContext, Claims, TokenPair, TokenType,
};
pub use config::{ApiConfig, CacheSettings};
pub use db::{DbClient, DbConfig};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use middleware::{auth_middleware, AuthExtractor, AuthMiddlewareState};
pub use openapi::ApiDoc;
pub use routes::{create_api_router, SecureRouterBuilder};
pub use state::AppState;
pub use types::*;

pub use parking_storage::OccupancyCache;
