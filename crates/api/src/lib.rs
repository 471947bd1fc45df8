pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;

use axum::Json;
use legal_rag_common::ApiResponse;
use legal_rag_core::{Pipeline, PipelineState, RagCore};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::warn;

pub use server::ApiServer;

pub use legal_rag_common;
pub use legal_rag_core;

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub max_upload_bytes: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8081,
            cors_origins: vec!["*".to_string()],
            max_upload_bytes: 32 * 1024 * 1024, // 32MB
        }
    }
}

impl ApiConfig {
    /// Reads `HOST`, `PORT`, `CORS_ORIGINS` (comma separated) and
    /// `MAX_UPLOAD_BYTES`; anything missing or unparsable keeps its default.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(host) = std::env::var("HOST") {
            config.host = host;
        }
        if let Ok(port) = std::env::var("PORT") {
            match port.parse() {
                Ok(port) => config.port = port,
                Err(_) => warn!("Ignoring invalid PORT value '{}'", port),
            }
        }
        if let Ok(origins) = std::env::var("CORS_ORIGINS") {
            config.cors_origins = origins
                .split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect();
        }
        if let Ok(limit) = std::env::var("MAX_UPLOAD_BYTES") {
            match limit.parse() {
                Ok(limit) => config.max_upload_bytes = limit,
                Err(_) => warn!("Ignoring invalid MAX_UPLOAD_BYTES value '{}'", limit),
            }
        }

        config
    }
}

/// Shared handler state. Ingestion takes `state` for writing, queries for reading.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub state: Arc<RwLock<PipelineState>>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(core: RagCore) -> Self {
        Self {
            pipeline: core.pipeline,
            state: core.state,
            started_at: Instant::now(),
        }
    }
}

pub fn create_success_response<T: serde::Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse::success(data))
}
