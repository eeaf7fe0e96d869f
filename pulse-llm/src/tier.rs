//! Difficulty → ordered model list.

use std::collections::BTreeMap;

use pulse_core::config::{LlmConfig, FALLBACK_DIFFICULTY};

use crate::error::LlmError;
use crate::types::Difficulty;

/// Resolves a [`Difficulty`] to the ordered models to try.
///
/// Missing or empty entries fall back to the `medium` tier, which must exist
/// and be non-empty.
#[derive(Debug, Clone)]
pub struct ModelTierResolver {
    tiers: BTreeMap<String, Vec<String>>,
}

impl ModelTierResolver {
    /// Build from a tier table.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Config`] if there is no non-empty `medium` tier.
    pub fn new(tiers: BTreeMap<String, Vec<String>>) -> Result<Self, LlmError> {
        match tiers.get(FALLBACK_DIFFICULTY) {
            Some(models) if !models.is_empty() => Ok(Self { tiers }),
            _ => Err(LlmError::Config(format!(
                "model tier table must define a non-empty '{FALLBACK_DIFFICULTY}' tier"
            ))),
        }
    }

    /// Build from `[llm.tiers]`.
    ///
    /// # Errors
    ///
    /// See [`ModelTierResolver::new`].
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        Self::new(config.tiers.clone())
    }

    /// Ordered candidate models for `difficulty`.
    #[must_use]
    pub fn resolve(&self, difficulty: Difficulty) -> &[String] {
        match self.tiers.get(difficulty.as_str()) {
            Some(models) if !models.is_empty() => models.as_slice(),
            _ => self.fallback(),
        }
    }

    fn fallback(&self) -> &[String] {
        self.tiers
            .get(FALLBACK_DIFFICULTY)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}
