// src/api.rs
//! HTTP surface: ingestion intake, poll feed, situation report, and the
//! grounded query endpoint.
//!
//! The feed returns the whole event cache as one ordered list, oldest
//! first; that ordering is part of the contract for poll consumers.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::cache::EventCache;
use crate::ingest::types::CanonicalEvent;
use crate::pipeline;
use crate::rag::index::RetrievalIndex;
use crate::rag::service::{QueryError, QueryService};

#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<EventCache>,
    pub index: Arc<RetrievalIndex>,
    pub query: Arc<QueryService>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/v1/stream", post(receive_stream))
        .route("/v1/frontend/feed", get(get_feed))
        .route("/v1/generate_report", get(generate_report))
        .route("/v1/query", post(query))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(serde::Serialize)]
struct StreamAck {
    status: &'static str,
    /// Current event-cache size after the push.
    count: usize,
}

#[derive(serde::Serialize)]
struct ApiError {
    error: String,
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

fn reject(status: StatusCode, msg: impl Into<String>) -> (StatusCode, Json<ApiError>) {
    (
        status,
        Json(ApiError {
            error: msg.into(),
        }),
    )
}

/// Ingestion intake: one canonical event record pushed by the pipeline
/// or an external producer.
async fn receive_stream(
    State(state): State<AppState>,
    Json(event): Json<CanonicalEvent>,
) -> ApiResult<StreamAck> {
    pipeline::ingest_one(event, &state.cache, &state.index)
        .await
        .map_err(|reason| reject(StatusCode::UNPROCESSABLE_ENTITY, reason))?;
    Ok(Json(StreamAck {
        status: "received",
        count: state.cache.len(),
    }))
}

/// Poll endpoint: full cache contents, oldest first.
async fn get_feed(State(state): State<AppState>) -> Json<Vec<CanonicalEvent>> {
    Json(state.cache.read_all())
}

#[derive(serde::Serialize)]
struct ReportResp {
    report: String,
}

fn query_error_response(e: QueryError) -> (StatusCode, Json<ApiError>) {
    let status = match e {
        QueryError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        QueryError::Index(_) | QueryError::Generation(_) => StatusCode::BAD_GATEWAY,
    };
    reject(status, e.to_string())
}

/// On-demand source-cited situation summary over the current cache.
async fn generate_report(State(state): State<AppState>) -> ApiResult<ReportResp> {
    let report = state
        .query
        .report(&state.cache)
        .await
        .map_err(query_error_response)?;
    Ok(Json(ReportResp { report }))
}

#[derive(serde::Deserialize)]
struct QueryReq {
    question: String,
    #[serde(default)]
    k: Option<usize>,
}

#[derive(serde::Serialize)]
struct QueryResp {
    answer: String,
}

/// Context-grounded question answering over the retrieval index.
async fn query(
    State(state): State<AppState>,
    Json(req): Json<QueryReq>,
) -> ApiResult<QueryResp> {
    if req.question.trim().is_empty() {
        return Err(reject(StatusCode::UNPROCESSABLE_ENTITY, "empty question"));
    }
    let answer = state
        .query
        .answer(&req.question, req.k)
        .await
        .map_err(query_error_response)?;
    Ok(Json(QueryResp { answer }))
}
