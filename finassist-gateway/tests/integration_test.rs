//! Integration tests for the gateway HTTP API.
//!
//! Drives the full router with a scripted completer, plus one end-to-end
//! path through the real Groq provider against a mock server.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use finassist_gateway::{
    build_router, AppState, ChatCompleter, CompletionError, Conversation, ErrorResponse,
    GroqProvider, Message, QueryResponse, SessionStore, MAX_BODY_BYTES,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Completer that returns a fixed result and records each history it receives.
struct StubCompleter {
    result: Result<String, CompletionError>,
    calls: Mutex<Vec<Vec<Message>>>,
}

impl StubCompleter {
    fn ok(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            result: Ok(reply.to_string()),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn failing(err: CompletionError) -> Arc<Self> {
        Arc::new(Self {
            result: Err(err),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<Vec<Message>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatCompleter for StubCompleter {
    fn name(&self) -> &str {
        "stub"
    }

    async fn complete(&self, history: &[Message]) -> Result<String, CompletionError> {
        self.calls.lock().unwrap().push(history.to_vec());
        self.result.clone()
    }
}

fn create_test_app(completer: Arc<dyn ChatCompleter>) -> (axum::Router, AppState) {
    let conversation = Conversation::new(Arc::new(SessionStore::new()), completer);
    let state = AppState::new(conversation);
    (build_router(state.clone()), state)
}

/// Helper to make a request and get the status plus JSON body.
async fn request_json<T: serde::de::DeserializeOwned>(
    app: &axum::Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, T) {
    let request = Request::builder().method(method).uri(uri);

    let request = if let Some(b) = body {
        request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_string(&b).unwrap()))
            .unwrap()
    } else {
        request.body(Body::empty()).unwrap()
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    let json: T = serde_json::from_slice(&body).unwrap();

    (status, json)
}

// ─────────────────────────────────────────────────────────────────────────────
// Static and Health Endpoints
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_health_check() {
    let (app, _) = create_test_app(StubCompleter::ok("unused"));

    let (status, json): (_, Value) = request_json(&app, Method::GET, "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["service"], "Financial AI Assistant MCP Server");
}

#[tokio::test]
async fn test_index_serves_html() {
    let (app, _) = create_test_app(StubCompleter::ok("unused"));

    let request = Request::builder()
        .method(Method::GET)
        .uri("/")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap();
    assert!(content_type.starts_with("text/html"));

    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    assert!(String::from_utf8_lossy(&body).contains("Financial AI Assistant"));
}

#[tokio::test]
async fn test_trace_id_is_echoed() {
    let (app, _) = create_test_app(StubCompleter::ok("unused"));

    let request = Request::builder()
        .method(Method::GET)
        .uri("/health")
        .header("x-trace-id", "trace-42")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.headers()["x-trace-id"], "trace-42");
}

// ─────────────────────────────────────────────────────────────────────────────
// Query Endpoints
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_query_returns_reply_and_records_history() {
    let completer = StubCompleter::ok("hi there");
    let (app, state) = create_test_app(completer.clone());

    let (status, json): (_, QueryResponse) = request_json(
        &app,
        Method::POST,
        "/query",
        Some(json!({"session_id": "s1", "message": "hello"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.response, "hi there");
    assert_eq!(
        state.sessions().messages("s1").await.unwrap(),
        vec![Message::user("hello"), Message::assistant("hi there")]
    );
    assert_eq!(completer.calls().len(), 1);
}

#[tokio::test]
async fn test_query_without_session_id_uses_default() {
    let (app, state) = create_test_app(StubCompleter::ok("ok"));

    let (status, _): (_, QueryResponse) = request_json(
        &app,
        Method::POST,
        "/query",
        Some(json!({"message": "hello"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(state.sessions().keys().await, vec!["default".to_string()]);
}

#[tokio::test]
async fn test_simple_query_shares_default_session() {
    let completer = StubCompleter::ok("ok");
    let (app, state) = create_test_app(completer.clone());

    let _: (_, QueryResponse) = request_json(
        &app,
        Method::POST,
        "/query",
        Some(json!({"message": "first"})),
    )
    .await;
    let (status, json): (_, QueryResponse) = request_json(
        &app,
        Method::POST,
        "/simple-query",
        Some(json!({"message": "second"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.response, "ok");
    assert_eq!(state.sessions().count().await, 1);
    assert_eq!(completer.calls()[1].len(), 3);
}

#[tokio::test]
async fn test_missing_message_is_rejected() {
    let completer = StubCompleter::ok("unused");
    let (app, state) = create_test_app(completer.clone());

    let (status, json): (_, ErrorResponse) = request_json(
        &app,
        Method::POST,
        "/query",
        Some(json!({"session_id": "s1"})),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(json.detail.contains("message"));
    assert!(completer.calls().is_empty());
    assert_eq!(state.sessions().count().await, 0);
}

#[tokio::test]
async fn test_null_session_id_is_rejected() {
    let completer = StubCompleter::ok("unused");
    let (app, state) = create_test_app(completer.clone());

    let (status, json): (_, ErrorResponse) = request_json(
        &app,
        Method::POST,
        "/query",
        Some(json!({"session_id": null, "message": "hello"})),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(json.detail.contains("session_id"));
    assert!(completer.calls().is_empty());
    assert_eq!(state.sessions().count().await, 0);
}

#[tokio::test]
async fn test_oversized_body_returns_detail() {
    let completer = StubCompleter::ok("unused");
    let (app, state) = create_test_app(completer.clone());

    let (status, json): (_, ErrorResponse) = request_json(
        &app,
        Method::POST,
        "/query",
        Some(json!({"message": "x".repeat(MAX_BODY_BYTES + 1)})),
    )
    .await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(json.detail.contains("length limit"));
    assert!(completer.calls().is_empty());
    assert_eq!(state.sessions().count().await, 0);
}

#[tokio::test]
async fn test_upstream_failure_returns_detail_and_keeps_user_message() {
    let completer = StubCompleter::failing(CompletionError::Upstream {
        status: 401,
        body: "Invalid API Key".into(),
    });
    let (app, state) = create_test_app(completer);

    let (status, json): (_, ErrorResponse) = request_json(
        &app,
        Method::POST,
        "/query",
        Some(json!({"session_id": "s1", "message": "hello"})),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json.detail, "Groq API error: Invalid API Key");
    assert_eq!(
        state.sessions().messages("s1").await.unwrap(),
        vec![Message::user("hello")]
    );
}

#[tokio::test]
async fn test_sessions_counts_distinct_keys() {
    let (app, _) = create_test_app(StubCompleter::ok("ok"));

    for session_id in ["a", "b", "a", "c"] {
        let _: (_, QueryResponse) = request_json(
            &app,
            Method::POST,
            "/query",
            Some(json!({"session_id": session_id, "message": "hi"})),
        )
        .await;
    }

    let (status, json): (_, Value) = request_json(&app, Method::GET, "/sessions", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["active_sessions"], 3);
}

// ─────────────────────────────────────────────────────────────────────────────
// End to End Through the Groq Provider
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_query_through_groq_provider() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "Diversify."}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = GroqProvider::new(Some("gsk_test".into())).with_base_url(server.uri());
    let (app, _) = create_test_app(Arc::new(provider));

    let (status, json): (_, QueryResponse) = request_json(
        &app,
        Method::POST,
        "/query",
        Some(json!({"session_id": "e2e", "message": "Any advice?"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.response, "Diversify.");
}

#[tokio::test]
async fn test_query_without_credential_reports_configuration_error() {
    let (app, state) = create_test_app(Arc::new(GroqProvider::new(None)));

    let (status, json): (_, ErrorResponse) = request_json(
        &app,
        Method::POST,
        "/simple-query",
        Some(json!({"message": "hello"})),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json.detail, "GROQ_API_KEY not found in environment");
    assert_eq!(state.sessions().messages("default").await.unwrap().len(), 1);
}
