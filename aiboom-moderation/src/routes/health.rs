use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use aiboom_shared::types::api::{HealthCheck, HealthResponse, HealthStatus};

use crate::AppState;

/// Liveness plus store and broker probes.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Response {
    let mut checks = Vec::with_capacity(2);

    checks.push(match state.store.ping().await {
        Ok(()) => HealthCheck::healthy("store"),
        Err(e) => HealthCheck::unhealthy("store", e.to_string()),
    });

    if let Some(rabbitmq) = state.publisher.rabbitmq() {
        checks.push(if rabbitmq.is_connected() {
            HealthCheck::healthy("rabbitmq")
        } else {
            HealthCheck {
                name: "rabbitmq".into(),
                status: HealthStatus::Degraded,
                message: Some("channel closed, events are not being published".into()),
            }
        });
    }

    let response = HealthResponse::healthy("aiboom-moderation", env!("CARGO_PKG_VERSION"))
        .with_checks(checks);

    let status = match response.status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status, Json(response)).into_response()
}

/// Returns Prometheus metrics.
pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match &state.metrics_handle {
        Some(handle) => handle.render().into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}
