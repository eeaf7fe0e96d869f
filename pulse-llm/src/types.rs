//! Core types for inference requests, attempts, and results.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::LlmError;
use crate::schema::OutputSchema;

/// How demanding a request is; selects the model tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    /// Cheap, fast models.
    Easy,
    /// The default tier, and the fallback for any unmapped difficulty.
    #[default]
    Medium,
    /// Strongest models first.
    Hard,
}

impl Difficulty {
    /// Lowercase key used in the tier table.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            other => Err(format!("Unknown difficulty: {other}")),
        }
    }
}

/// A structured-generation request. Immutable once built.
#[derive(Debug, Clone)]
pub struct InferenceRequest {
    prompt: String,
    difficulty: Difficulty,
    schema: OutputSchema,
}

impl InferenceRequest {
    /// Create a request.
    #[must_use]
    pub fn new(prompt: impl Into<String>, difficulty: Difficulty, schema: OutputSchema) -> Self {
        Self {
            prompt: prompt.into(),
            difficulty,
            schema,
        }
    }

    /// Prompt text sent to the model.
    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Requested difficulty.
    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    /// Contract the response must satisfy.
    #[must_use]
    pub fn schema(&self) -> &OutputSchema {
        &self.schema
    }
}

/// Per-call generation parameters handed to a backend.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    /// Always `application/json` for structured calls.
    pub response_mime_type: String,
    /// Response-shape constraint in the provider's schema dialect.
    pub response_schema: Value,
    /// Sampling temperature.
    pub temperature: f32,
}

/// A schema-valid response.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredResult {
    /// The decoded, validated JSON value.
    pub value: Value,
    /// Model that produced it.
    pub model: String,
    /// 1-based attempt number within that model.
    pub attempt: u32,
}

/// How a single attempt ended.
#[derive(Debug, Clone)]
pub enum AttemptOutcome {
    /// Decoded and schema-valid.
    Valid,
    /// Any recoverable failure.
    Failed(LlmError),
}

/// Record of one remote call, kept only for observability.
#[derive(Debug, Clone)]
pub struct InferenceAttempt {
    /// Model id called.
    pub model: String,
    /// 1-based attempt number within the model.
    pub attempt: u32,
    /// Response text as received, before fence stripping.
    pub raw_response: Option<String>,
    /// Decoded JSON, if decoding succeeded.
    pub parsed: Option<Value>,
    /// Result of the attempt.
    pub outcome: AttemptOutcome,
    /// Sleep taken after this attempt, if another attempt on the same model followed.
    pub backoff_after: Option<Duration>,
}

impl InferenceAttempt {
    /// Whether this attempt produced the final result.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self.outcome, AttemptOutcome::Valid)
    }
}

/// Everything that happened during one `generate` call.
#[derive(Debug, Clone, Default)]
pub struct GenerationReport {
    /// The validated result, if any attempt succeeded.
    pub result: Option<StructuredResult>,
    /// Attempts in the order they were made.
    pub attempts: Vec<InferenceAttempt>,
}

impl GenerationReport {
    /// Number of remote calls made.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.attempts.len()
    }

    /// The error of the last failed attempt.
    #[must_use]
    pub fn last_error(&self) -> Option<&LlmError> {
        self.attempts.iter().rev().find_map(|a| match &a.outcome {
            AttemptOutcome::Failed(err) => Some(err),
            AttemptOutcome::Valid => None,
        })
    }

    /// Distinct models in call order.
    #[must_use]
    pub fn models_tried(&self) -> Vec<&str> {
        let mut models: Vec<&str> = Vec::new();
        for attempt in &self.attempts {
            if models.last() != Some(&attempt.model.as_str()) {
                models.push(&attempt.model);
            }
        }
        models
    }
}

/// Typed form of the digest contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Digest {
    /// Model's reasoning before answering.
    pub reasoning: String,
    /// One-paragraph summary.
    pub summary: String,
    /// Key points worth surfacing.
    pub highlights: Vec<String>,
    /// `low`, `normal`, or `high`.
    pub urgency: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difficulty_parses_case_insensitively() {
        assert_eq!("HARD".parse::<Difficulty>(), Ok(Difficulty::Hard));
        assert_eq!("easy".parse::<Difficulty>(), Ok(Difficulty::Easy));
        assert!("extreme".parse::<Difficulty>().is_err());
    }

    #[test]
    fn difficulty_defaults_to_medium() {
        assert_eq!(Difficulty::default(), Difficulty::Medium);
        assert_eq!(Difficulty::Medium.to_string(), "medium");
    }

    #[test]
    fn report_summarises_attempts() {
        let failed = |model: &str, attempt| InferenceAttempt {
            model: model.into(),
            attempt,
            raw_response: None,
            parsed: None,
            outcome: AttemptOutcome::Failed(LlmError::Transport(format!("{model}#{attempt}"))),
            backoff_after: None,
        };
        let report = GenerationReport {
            result: None,
            attempts: vec![failed("a", 1), failed("a", 2), failed("b", 1)],
        };
        assert_eq!(report.calls(), 3);
        assert_eq!(report.models_tried(), vec!["a", "b"]);
        assert!(matches!(report.last_error(), Some(LlmError::Transport(m)) if m == "b#1"));
    }
}
