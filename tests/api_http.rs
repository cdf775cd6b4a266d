// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET /health
// - POST /v1/stream  (intake, validation, ack with cache count)
// - GET /v1/frontend/feed  (oldest-first ordering)
// - POST /v1/query  (grounded answer via mock generation)
// - GET /v1/generate_report

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value as Json};
use tower::ServiceExt as _; // for `oneshot`

use flashpoint_engine::api::{self, AppState};
use flashpoint_engine::cache::EventCache;
use flashpoint_engine::rag::embed::MockEmbedder;
use flashpoint_engine::rag::generate::MockGenClient;
use flashpoint_engine::rag::index::RetrievalIndex;
use flashpoint_engine::QueryService;

const BODY_LIMIT: usize = 1024 * 1024; // 1MB, safe for tests

fn test_router() -> (Router, AppState) {
    let cache = Arc::new(EventCache::new(100));
    let index = Arc::new(RetrievalIndex::new(Arc::new(MockEmbedder::new(128)), None));
    let query = Arc::new(QueryService::new(
        index.clone(),
        Arc::new(MockGenClient),
        Duration::from_secs(5),
        5,
    ));
    let state = AppState {
        cache,
        index,
        query,
    };
    (api::router(state.clone()), state)
}

async fn json_body(resp: axum::response::Response) -> Json {
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    serde_json::from_slice(&bytes).expect("parse json body")
}

fn post_json(uri: &str, payload: &Json) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("build request")
}

fn event_payload(text: &str, n: usize) -> Json {
    json!({
        "source": "Wire",
        "text": text,
        "url": format!("https://wire.example/{n}"),
        "timestamp": 1700000000.0 + n as f64,
        "bias": "Independent"
    })
}

#[tokio::test]
async fn health_returns_200_ok() {
    let (app, _) = test_router();
    let resp = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("oneshot /health");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn stream_intake_acknowledges_with_cache_count() {
    let (app, state) = test_router();
    let resp = app
        .oneshot(post_json(
            "/v1/stream",
            &event_payload("Missile strike near Kyiv", 1),
        ))
        .await
        .expect("oneshot /v1/stream");
    assert_eq!(resp.status(), StatusCode::OK);

    let v = json_body(resp).await;
    assert_eq!(v["status"], "received");
    assert_eq!(v["count"], 1);

    // Geo enrichment ran before the cache write.
    let cached = state.cache.read_all();
    assert_eq!(cached[0].lat, Some(50.4501));
    // The intake path also indexed the event.
    assert_eq!(state.index.len(), 1);
}

#[tokio::test]
async fn malformed_record_is_rejected_with_422() {
    let (app, state) = test_router();
    let resp = app
        .oneshot(post_json("/v1/stream", &event_payload("   ", 1)))
        .await
        .expect("oneshot /v1/stream");
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let v = json_body(resp).await;
    assert_eq!(v["error"], "empty text");
    assert_eq!(state.cache.len(), 0);
}

#[tokio::test]
async fn feed_returns_events_oldest_first() {
    let (app, _) = test_router();

    for n in 0..3 {
        let resp = app
            .clone()
            .oneshot(post_json(
                "/v1/stream",
                &event_payload(&format!("update {n}"), n),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let resp = app
        .oneshot(
            Request::builder()
                .uri("/v1/frontend/feed")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("oneshot feed");
    assert_eq!(resp.status(), StatusCode::OK);

    let v = json_body(resp).await;
    let texts: Vec<&str> = v
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["text"].as_str().unwrap())
        .collect();
    assert_eq!(texts, vec!["update 0", "update 1", "update 2"]);
}

#[tokio::test]
async fn query_returns_grounded_answer() {
    let (app, _) = test_router();

    let resp = app
        .clone()
        .oneshot(post_json(
            "/v1/stream",
            &event_payload("Port reopens after blockade lifted", 1),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .oneshot(post_json(
            "/v1/query",
            &json!({"question": "did the port reopen?", "k": 1}),
        ))
        .await
        .expect("oneshot query");
    assert_eq!(resp.status(), StatusCode::OK);

    let v = json_body(resp).await;
    let answer = v["answer"].as_str().unwrap();
    assert!(answer.contains("Port reopens after blockade lifted"));
    assert!(answer.contains("did the port reopen?"));
}

#[tokio::test]
async fn empty_question_is_rejected() {
    let (app, _) = test_router();
    let resp = app
        .oneshot(post_json("/v1/query", &json!({"question": "  "})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn report_cites_cached_events() {
    let (app, _) = test_router();

    let resp = app
        .clone()
        .oneshot(post_json(
            "/v1/stream",
            &event_payload("Convoy crosses the border", 1),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .oneshot(
            Request::builder()
                .uri("/v1/generate_report")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("oneshot report");
    assert_eq!(resp.status(), StatusCode::OK);

    let v = json_body(resp).await;
    let report = v["report"].as_str().unwrap();
    assert!(report.contains("Convoy crosses the border"));
    assert!(report.contains("RAW INTEL"));
}
