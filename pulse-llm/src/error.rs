//! Inference error types.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while talking to the remote inference API.
///
/// Inside [`crate::InferenceClient::generate`] every variant except
/// [`LlmError::RetriesExhausted`] and [`LlmError::Config`] is recovered
/// locally by retrying; only exhaustion reaches the caller.
#[derive(Debug, Clone, Error)]
pub enum LlmError {
    /// Network or API error while calling the remote service.
    #[error("LLM request failed: {0}")]
    Transport(String),

    /// The call succeeded but returned no usable content.
    #[error("Model {model} returned an empty response")]
    EmptyResponse {
        /// Model that produced the empty response.
        model: String,
    },

    /// Response text is not parseable as JSON.
    #[error("Failed to parse LLM response as JSON: {0}")]
    Decode(String),

    /// Parsed response does not satisfy the expected contract.
    #[error("LLM output schema validation failed: {0}")]
    SchemaValidation(String),

    /// Request timed out.
    #[error("LLM request timed out after {0}ms")]
    Timeout(u64),

    /// LLM provider is unavailable.
    #[error("LLM provider unavailable: {0}")]
    Unavailable(String),

    /// Every model in the tier was tried the maximum number of times.
    #[error("All LLM retry attempts exhausted after {attempts} tries: {last_error}")]
    RetriesExhausted {
        /// Remote calls made before giving up.
        attempts: u32,
        /// Description of the final failure.
        last_error: String,
    },

    /// Configuration error.
    #[error("LLM configuration error: {0}")]
    Config(String),
}

impl LlmError {
    /// Classify a transport failure; `timeout` is the client's configured limit.
    pub(crate) fn from_reqwest(err: &reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            LlmError::Timeout(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX))
        } else if err.is_connect() {
            LlmError::Unavailable(err.to_string())
        } else {
            LlmError::Transport(err.to_string())
        }
    }
}

impl From<pulse_core::PulseError> for LlmError {
    fn from(err: pulse_core::PulseError) -> Self {
        LlmError::Config(err.to_string())
    }
}
