//! Core type definitions for PULSE.
//!
//! Records are created once on acceptance and never mutated afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{PulseError, Result};

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Store-assigned identifier of a notification record.
///
/// Assigned by the store on insert; strictly increasing in insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(pub i64);

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Embedding Vector
// ---------------------------------------------------------------------------

/// A dense vector embedding produced by the remote embedding model.
///
/// Dimensionality is fixed by the remote API and must match across every
/// stored vector for similarity scores to be meaningful.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Embedding(pub Vec<f32>);

impl Embedding {
    /// Cosine similarity between two embeddings.
    ///
    /// See [`crate::embedding::cosine_similarity`] for the edge-case rules.
    #[must_use]
    pub fn cosine_similarity(&self, other: &Self) -> f64 {
        crate::embedding::cosine_similarity(self, other)
    }

    /// Dimensionality of the embedding.
    #[must_use]
    pub fn dimensions(&self) -> usize {
        self.0.len()
    }

    /// Whether the vector has no components at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<f32>> for Embedding {
    fn from(values: Vec<f32>) -> Self {
        Self(values)
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// An accepted notification that has not been persisted yet.
///
/// Can only be built with a non-empty embedding, so content without an
/// embedding never reaches the store.
#[derive(Debug, Clone)]
pub struct NewNotification {
    content: String,
    embedding: Embedding,
}

impl NewNotification {
    /// Pair notification content with its embedding.
    ///
    /// # Errors
    ///
    /// Returns [`PulseError::EmptyEmbedding`] if `embedding` has no components.
    pub fn new(content: impl Into<String>, embedding: Embedding) -> Result<Self> {
        if embedding.is_empty() {
            return Err(PulseError::EmptyEmbedding);
        }
        Ok(Self {
            content: content.into(),
            embedding,
        })
    }

    /// The raw notification text.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// The notification's embedding.
    #[must_use]
    pub fn embedding(&self) -> &Embedding {
        &self.embedding
    }

    /// Split into content and embedding.
    #[must_use]
    pub fn into_parts(self) -> (String, Embedding) {
        (self.content, self.embedding)
    }
}

/// A persisted notification together with its embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRecord {
    /// Store-assigned id.
    pub id: NotificationId,
    /// The raw notification text as received.
    pub content: String,
    /// Embedding of `content`.
    pub embedding: Embedding,
    /// When the record was written.
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Retrieval Score
// ---------------------------------------------------------------------------

/// A stored notification scored against a query embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredResult {
    /// Id of the matching record.
    pub id: NotificationId,
    /// Content of the matching record.
    pub content: String,
    /// Cosine similarity to the query, in \[-1.0, 1.0\].
    pub similarity: f64,
}
