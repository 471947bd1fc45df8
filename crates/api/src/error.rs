use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use legal_rag_common::{RagError, NOT_READY_MESSAGE};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Rag(#[from] RagError),
}

impl ApiError {
    fn parts(self) -> (StatusCode, String, &'static str) {
        match self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg, "VALIDATION_ERROR"),
            ApiError::Rag(err) => {
                let code = err.code();
                match err {
                    RagError::Load { .. } => {
                        warn!("Document rejected: {}", err);
                        (StatusCode::BAD_REQUEST, err.to_string(), code)
                    }
                    RagError::InvalidInput(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg, code),
                    RagError::StoreNotFound(_) => {
                        (StatusCode::CONFLICT, NOT_READY_MESSAGE.to_string(), code)
                    }
                    RagError::Embedding(_) | RagError::Generation(_) => {
                        error!("Upstream model error: {}", err);
                        (StatusCode::BAD_GATEWAY, err.to_string(), code)
                    }
                    RagError::Store(_) | RagError::Configuration(_) => {
                        error!("Internal pipeline error: {}", err);
                        (StatusCode::INTERNAL_SERVER_ERROR, err.to_string(), code)
                    }
                }
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message, error_code) = self.parts();

        let response_body = json!({
            "success": false,
            "error": error_message,
            "error_code": error_code,
            "timestamp": chrono::Utc::now()
        });

        (status, Json(response_body)).into_response()
    }
}

pub fn validation_error(message: &str) -> ApiError {
    ApiError::Validation(message.to_string())
}

pub type ApiResult<T> = Result<T, ApiError>;
