use crate::{
    create_success_response,
    error::{validation_error, ApiError, ApiResult},
    AppState,
};
use axum::{
    extract::{Multipart, Query, State},
    routing::{get, post},
    Json, Router,
};
use legal_rag_common::{Answer, ApiResponse, SearchHit};
use legal_rag_core::{IngestReport, PipelineState, QueryOutcome, UploadedDocument};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Deserialize)]
pub struct SearchQuery {
    pub q: String,
    pub limit: Option<usize>,
}

#[derive(Deserialize)]
pub struct QueryRequest {
    pub question: String,
    pub top_k: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<Answer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<SearchHit>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub pipeline: PipelineState,
    pub entries: usize,
    pub embedding_model: String,
    pub store_path: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/documents", post(upload_documents))
        .route("/query", post(query))
        .route("/search", get(search))
        .route("/status", get(status))
}

async fn upload_documents(
    State(app): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<ApiResponse<IngestReport>>> {
    let mut uploads = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            debug!("Skipping multipart field {:?}", field.name());
            continue;
        }

        let name = field
            .file_name()
            .map(str::to_string)
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| validation_error("every file part needs a filename"))?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::Validation(format!("failed to read '{}': {}", name, e)))?;

        uploads.push(UploadedDocument::new(name, bytes.to_vec()));
    }

    if uploads.is_empty() {
        return Err(validation_error("no 'file' parts were uploaded"));
    }

    info!("Received {} documents for ingestion", uploads.len());

    let mut state = app.state.write().await;
    let report = app.pipeline.ingest(&mut state, uploads).await?;

    Ok(create_success_response(report))
}

async fn query(
    State(app): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> ApiResult<Json<ApiResponse<QueryResponse>>> {
    if request.top_k == Some(0) {
        return Err(validation_error("top_k must be positive"));
    }

    let state = app.state.read().await;
    let outcome = app
        .pipeline
        .answer(&state, &request.question, request.top_k)
        .await?;

    let response = match outcome {
        QueryOutcome::Answered(answer) => QueryResponse {
            ready: true,
            answer: Some(answer),
            message: None,
        },
        QueryOutcome::NotReady(message) => QueryResponse {
            ready: false,
            answer: None,
            message: Some(message),
        },
    };

    Ok(create_success_response(response))
}

async fn search(
    State(app): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<ApiResponse<SearchResponse>>> {
    if query.limit == Some(0) {
        return Err(validation_error("limit must be positive"));
    }

    let state = app.state.read().await;
    let results = app.pipeline.search(&state, &query.q, query.limit).await?;

    Ok(create_success_response(SearchResponse {
        total: results.len(),
        query: query.q,
        results,
    }))
}

async fn status(State(app): State<AppState>) -> Json<ApiResponse<StatusResponse>> {
    let pipeline = app.state.read().await.clone();
    let store = app.pipeline.store();

    create_success_response(StatusResponse {
        pipeline,
        entries: store.len().await,
        embedding_model: store.embedding_model().to_string(),
        store_path: store.path().map(|path| path.display().to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{app_state, body_json, multipart_body};
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use legal_rag_common::NOT_READY_MESSAGE;
    use tower::ServiceExt;

    fn app(state: AppState) -> Router {
        routes().with_state(state)
    }

    fn json_request(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn upload_request(files: &[(&str, &str)]) -> Request<Body> {
        let (content_type, body) = multipart_body(files);
        Request::builder()
            .method("POST")
            .uri("/documents")
            .header(header::CONTENT_TYPE, content_type)
            .body(body)
            .unwrap()
    }

    #[tokio::test]
    async fn test_query_before_upload_is_not_ready() {
        let response = app(app_state().await)
            .oneshot(json_request("/query", serde_json::json!({ "question": "Governing law?" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"]["ready"], false);
        assert_eq!(body["data"]["message"], NOT_READY_MESSAGE);
    }

    #[tokio::test]
    async fn test_search_before_upload_conflicts() {
        let response = app(app_state().await)
            .oneshot(
                Request::builder()
                    .uri("/search?q=governing%20law")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = body_json(response).await;
        assert_eq!(body["error_code"], "STORE_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_upload_then_query_and_search() {
        let state = app_state().await;

        let response = app(state.clone())
            .oneshot(upload_request(&[
                ("contract.txt", "Clause 1: Governing law is India."),
                ("policy.txt", "Clause 2: Data privacy is a top priority."),
            ]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"]["documents"].as_array().unwrap().len(), 2);
        assert_eq!(body["data"]["total_chunks"], 2);

        let response = app(state.clone())
            .oneshot(json_request(
                "/query",
                serde_json::json!({ "question": "What is the governing law?", "top_k": 1 }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"]["ready"], true);
        let answer = &body["data"]["answer"];
        assert!(answer["text"].as_str().unwrap().contains("contract.txt"));
        assert!(answer["sources"][0]["text"]
            .as_str()
            .unwrap()
            .contains("Governing law is India"));

        let response = app(state.clone())
            .oneshot(
                Request::builder()
                    .uri("/search?q=data%20privacy&limit=5")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"]["total"], 2);
        assert_eq!(body["data"]["results"][0]["metadata"]["source"], "policy.txt");

        let response = app(state)
            .oneshot(Request::builder().uri("/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["data"]["pipeline"]["state"], "indexed");
        assert_eq!(body["data"]["entries"], 2);
        assert!(body["data"]["store_path"].is_null());
    }

    #[tokio::test]
    async fn test_unsupported_upload_is_rejected() {
        let state = app_state().await;
        let response = app(state.clone())
            .oneshot(upload_request(&[("scan.docx", "binary")]))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error_code"], "LOAD_ERROR");
        assert!(!state.state.read().await.is_ready());
    }

    #[tokio::test]
    async fn test_upload_without_files_is_rejected() {
        let response = app(app_state().await)
            .oneshot(upload_request(&[]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error_code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_oversized_query_is_unprocessable() {
        let state = app_state().await;
        let response = app(state.clone())
            .oneshot(upload_request(&[("contract.txt", "Clause 1: Governing law is India.")]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let question = "governing law ".repeat(1000);
        let response = app(state)
            .oneshot(json_request("/query", serde_json::json!({ "question": question })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_json(response).await;
        assert_eq!(body["error_code"], "INVALID_INPUT");
    }

    #[tokio::test]
    async fn test_zero_top_k_is_rejected() {
        let response = app(app_state().await)
            .oneshot(json_request(
                "/query",
                serde_json::json!({ "question": "anything", "top_k": 0 }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
