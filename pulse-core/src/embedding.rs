//! Vector math over embeddings.
//!
//! Embeddings themselves are produced remotely (see `pulse-llm`); this module
//! only compares them.

use crate::error::{PulseError, Result};
use crate::types::Embedding;

// ---------------------------------------------------------------------------
// Cosine similarity
// ---------------------------------------------------------------------------

/// Compute the cosine similarity between two embedding vectors.
///
/// Accumulates in `f64` and returns a value clamped to \[-1.0, 1.0\].
/// Returns `0.0` instead of dividing by zero when either vector has zero
/// magnitude, and `0.0` when the dimensionalities differ.
#[must_use]
pub fn cosine_similarity(a: &Embedding, b: &Embedding) -> f64 {
    if a.0.len() != b.0.len() {
        tracing::debug!(
            left = a.0.len(),
            right = b.0.len(),
            "Cosine similarity over mismatched dimensions"
        );
        return 0.0;
    }

    let mut dot = 0.0_f64;
    let mut mag_a = 0.0_f64;
    let mut mag_b = 0.0_f64;

    for (&x, &y) in a.0.iter().zip(b.0.iter()) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        mag_a += x * x;
        mag_b += y * y;
    }

    let denom = mag_a.sqrt() * mag_b.sqrt();
    if denom < f64::EPSILON {
        return 0.0;
    }

    (dot / denom).clamp(-1.0, 1.0)
}

/// Check that `candidate` has the dimensionality `expected`.
///
/// # Errors
///
/// Returns [`PulseError::DimensionMismatch`] when they differ.
pub fn ensure_dimensions(expected: usize, candidate: &Embedding) -> Result<()> {
    if candidate.dimensions() == expected {
        Ok(())
    } else {
        Err(PulseError::DimensionMismatch {
            expected,
            actual: candidate.dimensions(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
