use crate::AppState;
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde_json::json;
use tracing::debug;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/live", get(liveness_check))
}

async fn health_check(State(app): State<AppState>) -> Json<serde_json::Value> {
    debug!("Health check requested");

    let state = app.state.read().await;
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_seconds": app.started_at.elapsed().as_secs(),
        "pipeline": *state,
        "embedding_model": app.pipeline.store().embedding_model(),
    }))
}

// Ready once documents have been indexed.
async fn readiness_check(State(app): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    debug!("Readiness check requested");

    let ready = app.state.read().await.is_ready();
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "status": if ready { "ready" } else { "not_ready" },
            "timestamp": chrono::Utc::now(),
        })),
    )
}

async fn liveness_check(State(app): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "alive",
        "timestamp": chrono::Utc::now(),
        "uptime_seconds": app.started_at.elapsed().as_secs(),
    }))
}
