//! Route definitions for the gateway.
//!
//! Provides the query endpoints, health and session counters, and the
//! static chat page.

use crate::conversation::Conversation;
use crate::error::ApiError;
use crate::session::{SessionStore, DEFAULT_SESSION_ID};
use axum::{
    extract::{rejection::JsonRejection, State},
    response::{Html, Json},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;

/// Name reported by the health endpoint.
pub const SERVICE_NAME: &str = "Financial AI Assistant MCP Server";

const INDEX_HTML: &str = include_str!("../static/index.html");

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub conversation: Arc<Conversation>,
    pub default_session_id: Arc<str>,
}

impl AppState {
    pub fn new(conversation: Conversation) -> Self {
        Self {
            conversation: Arc::new(conversation),
            default_session_id: Arc::from(DEFAULT_SESSION_ID),
        }
    }

    /// Use a different key for requests that do not name a session.
    pub fn with_default_session_id(mut self, id: impl AsRef<str>) -> Self {
        self.default_session_id = Arc::from(id.as_ref());
        self
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        self.conversation.sessions()
    }
}

/// Query request body.
#[derive(Debug, Serialize, Deserialize)]
pub struct QueryRequest {
    /// Omitted means the default session; an explicit `null` is rejected.
    #[serde(
        default,
        deserialize_with = "present_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub session_id: Option<String>,
    pub message: String,
}

/// Only called when the field is present, so `null` fails as a non-string.
fn present_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(Some)
}

/// Simple query request body; always uses the default session.
#[derive(Debug, Serialize, Deserialize)]
pub struct SimpleQueryRequest {
    pub message: String,
}

/// Query response.
#[derive(Debug, Serialize, Deserialize)]
pub struct QueryResponse {
    pub response: String,
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Session counter response.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionsResponse {
    pub active_sessions: usize,
}

/// Build the router with all routes.
pub fn build_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/query", post(query_handler))
        .route("/simple-query", post(simple_query_handler))
        .route("/health", get(health_handler))
        .route("/sessions", get(sessions_handler))
        .with_state(state)
}

async fn query_handler(
    State(state): State<AppState>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<QueryResponse>, ApiError> {
    let Json(request) = payload?;
    let session_id = request
        .session_id
        .unwrap_or_else(|| state.default_session_id.to_string());

    let response = state
        .conversation
        .handle(&session_id, &request.message)
        .await?;

    Ok(Json(QueryResponse { response }))
}

async fn simple_query_handler(
    State(state): State<AppState>,
    payload: Result<Json<SimpleQueryRequest>, JsonRejection>,
) -> Result<Json<QueryResponse>, ApiError> {
    let Json(request) = payload?;

    let response = state
        .conversation
        .handle(&state.default_session_id, &request.message)
        .await?;

    Ok(Json(QueryResponse { response }))
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".into(),
        service: SERVICE_NAME.into(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}

async fn sessions_handler(State(state): State<AppState>) -> Json<SessionsResponse> {
    Json(SessionsResponse {
        active_sessions: state.sessions().count().await,
    })
}

async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}
