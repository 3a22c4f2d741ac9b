/// Health check and metrics endpoints
///
/// `/health` is static and never touches the cache or an upstream hop, so it
/// stays green while the registry is down. `/health/ready` reports whether
/// this role can serve resolutions at all.
use crate::{config::Role, context::AppContext, metrics};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde_json::json;

/// Build health check routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/health", get(health_basic))
        .route("/health/live", get(liveness_probe))
        .route("/health/ready", get(readiness_probe))
        .route("/metrics", get(metrics_handler))
}

/// Basic health check
pub async fn health_basic() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Liveness probe
pub async fn liveness_probe(State(ctx): State<AppContext>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "alive",
        "role": ctx.role().as_str(),
        "uptimeSeconds": ctx.uptime_secs(),
    }))
}

/// Readiness probe. A resolver without a registry endpoint is not ready.
pub async fn readiness_probe(
    State(ctx): State<AppContext>,
) -> (StatusCode, Json<serde_json::Value>) {
    let ready = match ctx.role() {
        Role::Resolver => ctx
            .resolution
            .as_ref()
            .map(|service| service.is_configured())
            .unwrap_or(false),
        Role::Gateway | Role::Standalone => ctx.edge.is_some(),
        Role::Registry => ctx.ledger.is_some(),
    };

    if ready {
        (StatusCode::OK, Json(json!({ "status": "ready" })))
    } else {
        tracing::warn!(role = ctx.role().as_str(), "readiness_probe_failed");
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "unavailable" })),
        )
    }
}

/// Prometheus text exposition
pub async fn metrics_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::render_metrics(),
    )
}
