//! Endpoint handlers and router.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::{Method, StatusCode},
    routing::{any, get},
    Json, Router,
};
use serde::Serialize;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::dispatch::Dispatcher;
use crate::error::SubmissionError;
use crate::response::FormResponse;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
}

impl AppState {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
        }
    }
}

/// Build the router: the submission endpoint on every path except `/health`.
///
/// `/health` only answers `GET`. Preflights there still get the CORS response
/// and any other method gets the usual 405 envelope.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health).fallback(health_fallback))
        .route("/", any(submit))
        .fallback(submit)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn health_fallback(State(state): State<AppState>, method: Method) -> FormResponse {
    if method == Method::OPTIONS {
        state.dispatcher.handle(&method, &[]).await
    } else {
        state.dispatcher.reject(SubmissionError::MethodNotAllowed)
    }
}

// =============================================================================
// Submissions
// =============================================================================

/// Submission endpoint.
///
/// Accepts any method so that preflight and wrong-method requests get the
/// same envelope and CORS headers as everything else. Bodies axum refuses to
/// buffer (over the size limit, or a broken stream) get them too.
pub async fn submit(
    State(state): State<AppState>,
    method: Method,
    body: Result<Bytes, BytesRejection>,
) -> FormResponse {
    match body {
        Ok(body) => state.dispatcher.handle(&method, &body).await,
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            state.dispatcher.reject(SubmissionError::BodyTooLarge)
        }
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "submission_body_unreadable");
            state.dispatcher.reject(SubmissionError::UnreadableBody)
        }
    }
}
