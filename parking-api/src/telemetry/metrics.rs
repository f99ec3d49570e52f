//! Prometheus Metrics Definitions
//!
//! HTTP, database and occupancy-cache metrics, exposed on `/metrics` for
//! Prometheus scraping.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use once_cell::sync::Lazy;
use parking_storage::{CacheStats, OccupancyCache};
use prometheus::{
    register_counter_vec, register_gauge, register_gauge_vec, register_histogram_vec, CounterVec,
    Encoder, Gauge, GaugeVec, HistogramVec, TextEncoder,
};

use crate::error::{ApiError, ApiResult};

/// HTTP request latency buckets (seconds)
/// Covers: 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 2.5s, 5s, 10s
const HTTP_LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0, 10.0,
];

/// Database operation latency buckets (seconds)
const DB_LATENCY_BUCKETS: &[f64] =
    &[0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0];

/// Global metrics instance - initialized once at startup
pub static METRICS: Lazy<ApiResult<ParkingMetrics>> = Lazy::new(ParkingMetrics::new);

/// Container for all service metrics.
#[derive(Clone)]
pub struct ParkingMetrics {
    /// HTTP request counter - labels: method, path, status
    pub http_requests_total: CounterVec,

    /// HTTP request duration histogram - labels: method, path
    pub http_request_duration_seconds: HistogramVec,

    /// Database operation counter - labels: operation, entity, status
    pub db_operations_total: CounterVec,

    /// Database operation duration histogram - labels: operation, entity
    pub db_operation_duration_seconds: HistogramVec,

    /// Occupancy cache counters sampled at scrape - labels: outcome
    pub occupancy_cache_events: GaugeVec,

    /// Occupancy cache hit rate (0.0 to 1.0)
    pub occupancy_cache_hit_rate: Gauge,
}

impl ParkingMetrics {
    /// Create and register all metrics with Prometheus.
    pub fn new() -> ApiResult<Self> {
        Ok(Self {
            http_requests_total: register_counter_vec!(
                "parkings_http_requests_total",
                "Total number of HTTP requests",
                &["method", "path", "status"]
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register http_requests_total: {}", e)))?,

            http_request_duration_seconds: register_histogram_vec!(
                "parkings_http_request_duration_seconds",
                "HTTP request duration in seconds",
                &["method", "path"],
                HTTP_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register http_request_duration_seconds: {}", e)))?,

            db_operations_total: register_counter_vec!(
                "parkings_db_operations_total",
                "Total number of database operations",
                &["operation", "entity", "status"]
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register db_operations_total: {}", e)))?,

            db_operation_duration_seconds: register_histogram_vec!(
                "parkings_db_operation_duration_seconds",
                "Database operation duration in seconds",
                &["operation", "entity"],
                DB_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register db_operation_duration_seconds: {}", e)))?,

            occupancy_cache_events: register_gauge_vec!(
                "parkings_occupancy_cache_events",
                "Occupancy cache events since startup",
                &["outcome"]
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register occupancy_cache_events: {}", e)))?,

            occupancy_cache_hit_rate: register_gauge!(
                "parkings_occupancy_cache_hit_rate",
                "Share of occupancy reads answered from the cache"
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register occupancy_cache_hit_rate: {}", e)))?,
        })
    }

    /// Record an HTTP request.
    pub fn record_http_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.http_requests_total
            .with_label_values(&[method, path, &status_str])
            .inc();
        self.http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);
    }

    /// Record a database operation.
    pub fn record_db_operation(
        &self,
        operation: &str,
        entity: &str,
        success: bool,
        duration_secs: f64,
    ) {
        let status = if success { "success" } else { "error" };
        self.db_operations_total
            .with_label_values(&[operation, entity, status])
            .inc();
        self.db_operation_duration_seconds
            .with_label_values(&[operation, entity])
            .observe(duration_secs);
    }

    /// Copy a cache statistics snapshot into the gauges.
    pub fn observe_cache_stats(&self, stats: &CacheStats) {
        let events = [
            ("hit", stats.hits),
            ("miss", stats.misses),
            ("failure", stats.cache_failures),
            ("repopulation", stats.repopulations),
        ];
        for (outcome, count) in events {
            self.occupancy_cache_events
                .with_label_values(&[outcome])
                .set(count as f64);
        }
        self.occupancy_cache_hit_rate.set(stats.hit_rate());
    }
}

/// Handler for GET /metrics endpoint.
///
/// Returns Prometheus text format metrics.
#[utoipa::path(
    get,
    path = "/metrics",
    tag = "Observability",
    responses(
        (status = 200, description = "Prometheus metrics in text format", content_type = "text/plain"),
        (status = 500, description = "Failed to encode metrics"),
    ),
)]
pub async fn metrics_handler(State(occupancy): State<OccupancyCache>) -> impl IntoResponse {
    if let Ok(metrics) = METRICS.as_ref() {
        metrics.observe_cache_stats(&occupancy.stats());
    }

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                format!("Failed to encode metrics: {}", e).into_bytes(),
            )
        }
    }
}
