//! Tracing Subscriber Initialization
//!
//! Structured logs go to stdout, as JSON by default. The filter comes from
//! `RUST_LOG` when set.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{ApiError, ApiResult};

const DEFAULT_FILTER: &str = "parking_api=debug,parking_storage=debug,tower_http=debug,info";

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

/// Telemetry configuration from environment variables.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to the startup log line
    pub service_name: String,
    /// Deployment environment (production, staging, development)
    pub environment: String,
    pub log_format: LogFormat,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "parking-api".to_string(),
            environment: "development".to_string(),
            log_format: LogFormat::Json,
        }
    }
}

impl TelemetryConfig {
    /// - `PARKING_SERVICE_NAME` (default: parking-api)
    /// - `PARKING_ENVIRONMENT` (default: development)
    /// - `PARKING_LOG_FORMAT`: "json" or "pretty" (default: json)
    pub fn from_env() -> Self {
        let log_format = match std::env::var("PARKING_LOG_FORMAT")
            .map(|s| s.to_lowercase())
            .as_deref()
        {
            Ok("pretty") => LogFormat::Pretty,
            _ => LogFormat::Json,
        };

        Self {
            service_name: std::env::var("PARKING_SERVICE_NAME")
                .unwrap_or_else(|_| "parking-api".to_string()),
            environment: std::env::var("PARKING_ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
            log_format,
        }
    }
}

/// Install the global tracing subscriber.
///
/// Call once at startup; a second call returns an error.
pub fn init_tracing(config: &TelemetryConfig) -> ApiResult<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = match config.log_format {
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
        LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init(),
    };
    result.map_err(|e| ApiError::internal_error(format!("Failed to init subscriber: {}", e)))?;

    tracing::info!(
        service_name = %config.service_name,
        environment = %config.environment,
        "Telemetry initialized"
    );

    Ok(())
}
