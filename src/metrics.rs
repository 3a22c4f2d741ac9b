/// Metrics and telemetry for namegate
///
/// Provides Prometheus-compatible metrics for monitoring:
/// - HTTP request counts and latencies
/// - Edge cache hit/miss/expired rates, size and evictions
/// - Upstream (resolver/registry) call outcomes and latencies
/// - Background job execution

use lazy_static::lazy_static;
use prometheus::{
    register_gauge, register_histogram_vec, register_int_counter_vec, register_int_gauge,
    Encoder, Gauge, HistogramVec, IntCounterVec, IntGauge, TextEncoder,
};

lazy_static! {
    // ========== HTTP Metrics ==========

    /// Total HTTP requests by method, path, and status
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "namegate_http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    /// HTTP request duration in seconds
    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "namegate_http_request_duration_seconds",
        "HTTP request latencies in seconds",
        &["method", "path"],
        vec![0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
    )
    .unwrap();

    // ========== Edge Cache Metrics ==========

    /// Cache lookups by outcome (hit, miss, expired)
    pub static ref CACHE_LOOKUPS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "namegate_cache_lookups_total",
        "Total number of edge cache lookups",
        &["outcome"]
    )
    .unwrap();

    /// Entries currently held by the edge cache
    pub static ref CACHE_ENTRIES: IntGauge = register_int_gauge!(
        "namegate_cache_entries",
        "Number of entries in the edge cache"
    )
    .unwrap();

    /// Entries removed by reason (expired, capacity)
    pub static ref CACHE_EVICTIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "namegate_cache_evictions_total",
        "Total number of edge cache evictions",
        &["reason"]
    )
    .unwrap();

    // ========== Upstream Metrics ==========

    /// Upstream calls by layer (resolver, registry) and outcome
    pub static ref UPSTREAM_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "namegate_upstream_requests_total",
        "Total number of upstream resolution calls",
        &["layer", "outcome"]
    )
    .unwrap();

    /// Upstream call duration in seconds
    pub static ref UPSTREAM_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "namegate_upstream_duration_seconds",
        "Upstream resolution latencies in seconds",
        &["layer"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0]
    )
    .unwrap();

    // ========== Background Job Metrics ==========

    /// Background job executions by job type and status
    pub static ref BACKGROUND_JOBS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "namegate_background_jobs_total",
        "Total number of background job executions",
        &["job_type", "status"]
    )
    .unwrap();

    // ========== System Metrics ==========

    /// Application uptime in seconds
    pub static ref UPTIME_SECONDS: Gauge = register_gauge!(
        "namegate_uptime_seconds",
        "Application uptime in seconds"
    )
    .unwrap();
}

/// Render metrics in Prometheus text format
pub fn render_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Record an HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16, duration: f64) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration);
}

/// Record an edge cache lookup outcome
pub fn record_cache_lookup(outcome: &str) {
    CACHE_LOOKUPS_TOTAL.with_label_values(&[outcome]).inc();
}

/// Record removed cache entries
pub fn record_cache_evictions(reason: &str, count: usize) {
    if count > 0 {
        CACHE_EVICTIONS_TOTAL
            .with_label_values(&[reason])
            .inc_by(count as u64);
    }
}

/// Publish the current cache size
pub fn set_cache_entries(count: usize) {
    CACHE_ENTRIES.set(count as i64);
}

/// Record an upstream call
pub fn record_upstream(layer: &str, outcome: &str, duration: f64) {
    UPSTREAM_REQUESTS_TOTAL
        .with_label_values(&[layer, outcome])
        .inc();
    UPSTREAM_DURATION_SECONDS
        .with_label_values(&[layer])
        .observe(duration);
}

/// Record a background job execution
pub fn record_background_job(job_type: &str, status: &str) {
    BACKGROUND_JOBS_TOTAL
        .with_label_values(&[job_type, status])
        .inc();
}
