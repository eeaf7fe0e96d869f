//! The seam between the inference client and a concrete provider.

use async_trait::async_trait;

use crate::error::LlmError;
use crate::types::GenerationConfig;

/// A remote inference provider.
///
/// Implementations make exactly one remote call per method invocation.
/// Retrying, tiering, and response validation all live in
/// [`crate::InferenceClient`].
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Short provider name for logs.
    fn name(&self) -> &str;

    /// Structured generation: return the raw response text.
    async fn generate_content(
        &self,
        model: &str,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<String, LlmError>;

    /// Embed `text`, returning every vector the provider sent back.
    async fn embed_content(
        &self,
        model: &str,
        text: &str,
        task_type: &str,
    ) -> Result<Vec<Vec<f32>>, LlmError>;
}

/// Backend used when no provider is configured. Every call fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledBackend;

#[async_trait]
impl InferenceBackend for DisabledBackend {
    fn name(&self) -> &str {
        "none"
    }

    async fn generate_content(
        &self,
        _model: &str,
        _prompt: &str,
        _config: &GenerationConfig,
    ) -> Result<String, LlmError> {
        Err(LlmError::Unavailable("No LLM provider configured".into()))
    }

    async fn embed_content(
        &self,
        _model: &str,
        _text: &str,
        _task_type: &str,
    ) -> Result<Vec<Vec<f32>>, LlmError> {
        Err(LlmError::Unavailable("No LLM provider configured".into()))
    }
}
