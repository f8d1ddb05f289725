//! Request handlers.

use std::time::Instant;

use axum::{
    extract::{MatchedPath, Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::http::server::AppState;
use crate::observability::metrics;

/// Liveness probe.
pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// Readiness probe. The server only starts once the aggregator exists, so
/// accepting the connection is enough.
pub async fn readiness() -> StatusCode {
    StatusCode::OK
}

/// The current snapshot as JSON.
pub async fn targets(State(state): State<AppState>) -> Response {
    let snapshot = state.aggregator.snapshot();
    match serde_json::to_vec(&*snapshot) {
        Ok(body) => ([(header::CONTENT_TYPE, "application/json")], body).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize snapshot");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// Record count and latency of every request.
pub async fn track_requests(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned());

    let response = next.run(request).await;
    metrics::record_request(&method, &path, response.status().as_u16(), start);
    response
}
