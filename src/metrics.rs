/// Metrics for the membership service
///
/// Provides Prometheus-compatible metrics for monitoring:
/// - HTTP request counts and latencies
/// - Directory query counts and latencies
/// - Cache hit/miss rates per namespace
/// - Bulk refresh task outcomes

use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge, Encoder, HistogramVec,
    IntCounterVec, IntGauge, TextEncoder,
};
use std::time::Duration;

lazy_static! {
    // ========== HTTP Metrics ==========

    /// Total HTTP requests by method, route, and status
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "memberd_http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    /// HTTP request duration in seconds
    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "memberd_http_request_duration_seconds",
        "HTTP request latencies in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();

    // ========== Directory Metrics ==========

    /// Directory operations by operation and outcome
    pub static ref DIRECTORY_QUERIES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "memberd_directory_queries_total",
        "Total number of directory operations",
        &["operation", "status"]
    )
    .unwrap();

    /// Directory operation duration in seconds, connection setup included
    pub static ref DIRECTORY_QUERY_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "memberd_directory_query_duration_seconds",
        "Directory operation latencies in seconds",
        &["operation"],
        vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    )
    .unwrap();

    // ========== Cache Metrics ==========

    /// Cache hits by namespace
    pub static ref CACHE_HITS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "memberd_cache_hits_total",
        "Total number of cache hits",
        &["namespace"]
    )
    .unwrap();

    /// Cache misses by namespace
    pub static ref CACHE_MISSES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "memberd_cache_misses_total",
        "Total number of cache misses",
        &["namespace"]
    )
    .unwrap();

    // ========== Bulk Refresh Metrics ==========

    /// Refresh tasks by namespace and outcome
    pub static ref REFRESH_TASKS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "memberd_refresh_tasks_total",
        "Total number of bulk refresh tasks",
        &["namespace", "status"]
    )
    .unwrap();

    /// Refresh tasks currently holding a concurrency slot
    pub static ref REFRESH_TASKS_ACTIVE: IntGauge = register_int_gauge!(
        "memberd_refresh_tasks_active",
        "Number of bulk refresh tasks currently running"
    )
    .unwrap();
}

/// Render metrics in Prometheus text format
pub fn render_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

fn outcome(success: bool) -> &'static str {
    if success {
        "success"
    } else {
        "failure"
    }
}

/// Record an HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration.as_secs_f64());
}

/// Record one logical directory operation
pub fn record_directory_query(operation: &str, duration: Duration, success: bool) {
    DIRECTORY_QUERIES_TOTAL
        .with_label_values(&[operation, outcome(success)])
        .inc();
    DIRECTORY_QUERY_DURATION_SECONDS
        .with_label_values(&[operation])
        .observe(duration.as_secs_f64());
}

/// Record a cache access
pub fn record_cache_access(namespace: &str, hit: bool) {
    if hit {
        CACHE_HITS_TOTAL.with_label_values(&[namespace]).inc();
    } else {
        CACHE_MISSES_TOTAL.with_label_values(&[namespace]).inc();
    }
}

/// Record the outcome of one bulk refresh task
pub fn record_refresh_task(namespace: &str, success: bool) {
    REFRESH_TASKS_TOTAL
        .with_label_values(&[namespace, outcome(success)])
        .inc();
}
