pub mod health;
pub mod knowledge;

use crate::AppState;
use axum::Router;

pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .nest("/health", health::routes())
        .nest("/api/v1", knowledge::routes())
        .with_state(state)
}

// Fallback handler for unmatched routes
pub async fn not_found_handler() -> axum::http::StatusCode {
    axum::http::StatusCode::NOT_FOUND
}
