//! REST API: notification ingest, similarity search, health.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use pulse_core::filter::{FilterDecision, IngressEvent, IngressError};
use pulse_core::types::ScoredResult;
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn, Instrument};
use uuid::Uuid;

use crate::error::ApiError;
use crate::pipeline;
use crate::state::AppState;

/// Plain-text reply for an accepted notification.
pub const RECEIVED: &str = "String received!";
/// Plain-text reply for a filtered notification.
pub const IGNORED: &str = "Ignored Notification";

/// Create the API router with all routes.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/send", post(send))
        .route("/search", get(search))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// `POST /send`: decode, filter, embed, store.
///
/// Once an event passes the filter the reply is always `200 String received!`;
/// embedding or storage failures are logged only. The embed and save run in
/// their own task so they finish even if the client goes away.
async fn send(State(state): State<AppState>, body: String) -> (StatusCode, String) {
    let event = match IngressEvent::parse(&body) {
        Ok(event) => event,
        Err(err) => {
            if err != IngressError::Empty {
                warn!(error = %err, "Rejected malformed notification");
            }
            return (StatusCode::BAD_REQUEST, err.to_string());
        }
    };

    match state.filter().check(&event) {
        FilterDecision::Accept => {}
        decision => {
            info!(channel = %event.channel, app = %event.app, ?decision, "Ignored notification");
            return (StatusCode::OK, IGNORED.to_string());
        }
    }

    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("ingest", %request_id, channel = %event.channel, app = %event.app);
    let task_state = state.clone();
    let handle = tokio::spawn(
        async move { pipeline::ingest(&task_state, event.raw).await }.instrument(span),
    );

    match handle.await {
        Ok(Ok(record)) => info!(%request_id, id = %record.id, "Notification accepted"),
        Ok(Err(err)) => warn!(%request_id, error = %err, "Notification accepted but not stored"),
        Err(err) => error!(%request_id, error = %err, "Ingest task failed"),
    }

    (StatusCode::OK, RECEIVED.to_string())
}

/// Query string for `GET /search`.
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    /// Free-text query.
    pub q: String,
    /// Minimum similarity; defaults to the configured threshold.
    pub threshold: Option<f64>,
}

/// Body of a `GET /search` reply.
#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    /// The query as received.
    pub query: String,
    /// Threshold applied.
    pub threshold: f64,
    /// Matches, best first.
    pub results: Vec<ScoredResult>,
}

async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    if params.q.trim().is_empty() {
        return Err(ApiError::bad_request("query parameter 'q' must not be empty"));
    }
    let threshold = params
        .threshold
        .unwrap_or(state.retrieval().config().threshold);
    if !(-1.0..=1.0).contains(&threshold) {
        return Err(ApiError::bad_request(format!(
            "threshold must lie in [-1, 1], got {threshold}"
        )));
    }

    let results = pipeline::search(&state, &params.q, threshold).await?;
    Ok(Json(SearchResponse {
        query: params.q,
        threshold,
        results,
    }))
}

/// Body of a `GET /health` reply.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `ok` when the store is readable.
    pub status: String,
    /// Crate version.
    pub version: String,
    /// Stored notification count.
    pub notifications: usize,
}

async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    let notifications = pipeline::count(&state).await?;
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        notifications,
    }))
}
