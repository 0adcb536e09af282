use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use crate::state::AppState;

/// GET /health: bare liveness probe.
pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status": "ok"})))
}

/// GET /v1/health/ready: readiness probe. Since there is no database to
/// ping, readiness reports whether the worker pool's cancellation token
/// has been registered and not yet cancelled.
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    let ready = state.core.worker_pool_alive().await;
    if ready {
        (StatusCode::OK, Json(json!({"status": "ready"})))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"status": "not_ready", "reason": "worker_pool_stopped"})),
        )
    }
}
