//! FinAssist Gateway - session-bounded chat forwarding to a financial-assistant LLM.
//!
//! ## Architecture
//!
//! ```text
//! Client → routes (parse, validate) → Conversation (lock session → append user
//!        → complete → append assistant → trim) → GroqProvider → Groq API
//! ```
//!
//! Sessions live in memory for the lifetime of the process.

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod conversation;
pub mod error;
pub mod provider;
pub mod routes;
pub mod session;
pub mod trace;

pub use conversation::Conversation;
pub use error::{ApiError, ErrorResponse};
pub use provider::{ChatCompleter, CompletionError, GroqProvider, Message, Role};
pub use routes::{AppState, QueryRequest, QueryResponse, SimpleQueryRequest};
pub use session::{Session, SessionStore, MAX_HISTORY};

use axum::{extract::DefaultBodyLimit, middleware, Router};
use finassist_common::config::Config;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};

/// Largest accepted request body. Larger bodies are rejected with 413.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Build application state from configuration.
pub fn build_state(config: &Config) -> AppState {
    let provider = GroqProvider::from_config(
        &config.llm,
        config.groq_api_key().map(str::to_string),
    );
    let conversation = Conversation::new(Arc::new(SessionStore::new()), Arc::new(provider))
        .with_max_history(config.session.max_messages);

    AppState::new(conversation).with_default_session_id(&config.session.default_session_id)
}

/// Build the gateway router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    routes::build_routes(state)
        .layer(middleware::from_fn(trace::trace_middleware))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
}

/// Start the gateway server and run until a shutdown signal arrives.
pub async fn start_server(config: &Config) -> anyhow::Result<()> {
    let addr = SocketAddr::from((
        config.network.bind.parse::<IpAddr>()?,
        config.network.port,
    ));

    let state = build_state(config);

    if config.groq_api_key().is_none() {
        tracing::warn!(
            "{} is not set; queries will fail until it is configured",
            finassist_common::config::API_KEY_ENV
        );
    }

    let eviction = config.session.idle_ttl_secs.map(|ttl| {
        tracing::info!(
            idle_ttl_secs = ttl,
            sweep_interval_secs = config.session.sweep_interval_secs,
            "Idle session eviction enabled"
        );
        session::spawn_eviction_task(
            state.sessions().clone(),
            Duration::from_secs(ttl),
            Duration::from_secs(config.session.sweep_interval_secs),
        )
    });

    let router = build_router(state);

    tracing::info!(model = %config.llm.model, "Starting gateway on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(handle) = eviction {
        handle.abort();
    }

    tracing::info!("Shutting down gateway");
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C"),
        _ = terminate => tracing::info!("Received SIGTERM"),
    }
}
