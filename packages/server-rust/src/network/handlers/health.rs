//! Health, liveness, and readiness probes.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::json;

use super::AppState;

/// Detailed health as JSON. Always 200; `state` carries the real answer.
pub async fn health_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    let health = state.health.state();

    Json(json!({
        "state": health.as_str(),
        "store": state.service.store().backend_name(),
        "profile": format!("{:?}", state.service.profile()).to_lowercase(),
        "in_flight": state.health.in_flight_count(),
        "uptime_secs": state.start_time.elapsed().as_secs(),
    }))
}

/// Liveness: the process answers, nothing more.
pub async fn liveness_handler() -> StatusCode {
    StatusCode::OK
}

/// Readiness: 200 only while `Ready`, 503 while starting or draining.
pub async fn readiness_handler(State(state): State<AppState>) -> StatusCode {
    if state.health.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
