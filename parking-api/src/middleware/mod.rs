//! Middleware modules for the parkings API
//!
//! - `auth`: bearer-token authentication for protected routers
//!
//! Observability middleware lives in [`crate::telemetry`].

mod auth;

pub use auth::{auth_middleware, AuthExtractor, AuthMiddlewareError, AuthMiddlewareState};
