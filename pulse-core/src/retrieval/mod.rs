//! Notification Retrieval — brute-force cosine similarity over stored embeddings.
//!
//! Every candidate is scored against the query, candidates below the threshold
//! are dropped, and the rest are ranked by similarity (descending, stable).
//! One vector comparison per stored record and no index; an approximate
//! nearest-neighbour index could replace the scan without changing the
//! contract.

pub mod scoring;

use crate::config::RetrievalConfig;
use crate::types::{Embedding, NotificationRecord, ScoredResult};

/// Default similarity threshold for [`RetrievalEngine::retrieve`].
pub const DEFAULT_THRESHOLD: f64 = 0.8;

/// The retrieval engine that finds stored notifications related to a query.
#[derive(Debug, Clone, Default)]
pub struct RetrievalEngine {
    config: RetrievalConfig,
}

impl RetrievalEngine {
    /// Create a new retrieval engine with the given configuration.
    #[must_use]
    pub fn new(config: RetrievalConfig) -> Self {
        Self { config }
    }

    /// The engine's configuration.
    #[must_use]
    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Score every candidate against `query` and keep those with
    /// similarity ≥ `threshold`, best first.
    ///
    /// Returns an empty vector (not an error) when `candidates` is empty or
    /// nothing clears the threshold. Zero-magnitude vectors score `0.0`.
    /// The configured `max_results`, if any, truncates the ranked list.
    #[must_use]
    pub fn retrieve(
        &self,
        query: &Embedding,
        candidates: &[NotificationRecord],
        threshold: f64,
    ) -> Vec<ScoredResult> {
        let mut results: Vec<ScoredResult> = candidates
            .iter()
            .map(|record| scoring::score(query, record))
            .filter(|scored| scored.similarity >= threshold)
            .collect();

        scoring::rank(&mut results);

        if let Some(limit) = self.config.max_results {
            results.truncate(limit);
        }

        tracing::debug!(
            candidates = candidates.len(),
            matched = results.len(),
            threshold,
            "Retrieval pass complete"
        );

        results
    }

    /// [`RetrievalEngine::retrieve`] with the configured threshold.
    #[must_use]
    pub fn retrieve_with_config(
        &self,
        query: &Embedding,
        candidates: &[NotificationRecord],
    ) -> Vec<ScoredResult> {
        self.retrieve(query, candidates, self.config.threshold)
    }
}
