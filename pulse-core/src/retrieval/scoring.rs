//! Per-candidate scoring and ranking for notification retrieval.
//!
//! Score(m) = cosine_similarity(query, m.embedding)

use std::cmp::Reverse;

use ordered_float::OrderedFloat;

use crate::types::{Embedding, NotificationRecord, ScoredResult};

/// Score one stored record against the query.
#[must_use]
pub fn score(query: &Embedding, record: &NotificationRecord) -> ScoredResult {
    ScoredResult {
        id: record.id,
        content: record.content.clone(),
        similarity: query.cosine_similarity(&record.embedding),
    }
}

/// Sort results by similarity, highest first.
///
/// The sort is stable: equal scores keep the order they were scored in,
/// which is store order (ascending id) when fed from `NotificationStore::list`.
pub fn rank(results: &mut [ScoredResult]) {
    results.sort_by_key(|r| Reverse(OrderedFloat(r.similarity)));
}
