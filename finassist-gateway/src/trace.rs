//! Request tracing middleware.

use axum::{extract::Request, middleware::Next, response::Response};
use finassist_common::logging::RequestContext;
use std::time::Instant;
use tracing::Instrument;

/// Service name attached to request contexts.
pub const TRACE_SERVICE: &str = "finassist-gateway";

/// Wrap each request in a span carrying its trace ID and echo the ID back.
pub async fn trace_middleware(request: Request, next: Next) -> Response {
    let ctx = RequestContext::from_headers(request.headers(), TRACE_SERVICE);
    let span = tracing::info_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
        trace_id = %ctx.trace_id,
        service = %ctx.service,
    );

    let start = Instant::now();
    let mut response = next.run(request).instrument(span.clone()).await;

    span.in_scope(|| {
        tracing::debug!(
            status = response.status().as_u16(),
            latency_ms = start.elapsed().as_millis() as u64,
            "Request completed"
        );
    });

    ctx.to_headers(response.headers_mut());
    response
}
