//! Embed → persist → retrieve flows shared by the HTTP API and the CLI.

use pulse_core::types::{Embedding, NewNotification, NotificationRecord, ScoredResult};
use pulse_core::PulseError;
use pulse_llm::prompt::PromptTemplate;
use pulse_llm::types::Digest;
use pulse_llm::{Difficulty, LlmError};
use thiserror::Error;
use tracing::{debug, info};

use crate::state::AppState;

/// Failure of a pipeline step.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The remote embedding call failed.
    #[error("embedding failed: {0}")]
    Embedding(#[from] LlmError),

    /// Generation exhausted every model, or the reply did not fit the digest.
    #[error("generation failed: {0}")]
    Generation(LlmError),

    /// The store rejected the operation.
    #[error("store error: {0}")]
    Store(#[from] PulseError),

    /// A blocking task panicked or was cancelled.
    #[error("background task failed: {0}")]
    Task(String),
}

/// Embed `content` and persist it. Nothing is stored unless embedding
/// succeeded.
///
/// # Errors
///
/// Returns [`PipelineError`] if embedding or the insert fails.
pub async fn ingest(state: &AppState, content: String) -> Result<NotificationRecord, PipelineError> {
    let embedding = state.client().embed(&content).await?;
    let notification = NewNotification::new(content, embedding)?;

    let store = state.store().clone();
    let record = tokio::task::spawn_blocking(move || store.save(notification))
        .await
        .map_err(|e| PipelineError::Task(e.to_string()))??;

    info!(
        id = %record.id,
        dimensions = record.embedding.dimensions(),
        "Stored notification"
    );
    Ok(record)
}

/// Embed `query` and rank every stored notification against it.
///
/// # Errors
///
/// Returns [`PipelineError`] if embedding or the read fails.
pub async fn search(
    state: &AppState,
    query: &str,
    threshold: f64,
) -> Result<Vec<ScoredResult>, PipelineError> {
    let embedding = state.client().embed(query).await?;
    rank_stored(state, &embedding, threshold).await
}

/// Rank every stored notification against an existing embedding.
///
/// # Errors
///
/// Returns [`PipelineError`] if the read fails.
pub async fn rank_stored(
    state: &AppState,
    query: &Embedding,
    threshold: f64,
) -> Result<Vec<ScoredResult>, PipelineError> {
    let store = state.store().clone();
    let candidates = tokio::task::spawn_blocking(move || store.list())
        .await
        .map_err(|e| PipelineError::Task(e.to_string()))??;

    let results = state.retrieval().retrieve(query, &candidates, threshold);
    debug!(candidates = candidates.len(), matched = results.len(), "Ranked stored notifications");
    Ok(results)
}

/// Retrieve notifications related to `query` and summarise them.
///
/// # Errors
///
/// Returns [`PipelineError`] if the query embedding, the read, or the
/// generation fails.
pub async fn digest(
    state: &AppState,
    template: &PromptTemplate,
    query: &str,
    threshold: f64,
    difficulty: Difficulty,
) -> Result<Digest, PipelineError> {
    let hits = search(state, query, threshold).await?;
    info!(hits = hits.len(), %difficulty, "Requesting digest");

    let request = template.digest_request(query, &hits, difficulty);
    state
        .client()
        .generate_typed::<Digest>(&request)
        .await
        .map_err(PipelineError::Generation)
}

/// Number of stored notifications.
///
/// # Errors
///
/// Returns [`PipelineError`] if the count query fails.
pub async fn count(state: &AppState) -> Result<usize, PipelineError> {
    let store = state.store().clone();
    let n = tokio::task::spawn_blocking(move || store.count())
        .await
        .map_err(|e| PipelineError::Task(e.to_string()))??;
    Ok(n)
}
