//! Inference client: tiered model fallback with retry, backoff, and output
//! validation on top of an [`InferenceBackend`].

use std::sync::Arc;
use std::time::Duration;

use pulse_core::config::LlmConfig;
use pulse_core::types::Embedding;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::backend::{DisabledBackend, InferenceBackend};
use crate::error::LlmError;
use crate::gemini::GeminiBackend;
use crate::retry::{BackoffPolicy, RetryState, Transition};
use crate::schema::SchemaValidator;
use crate::tier::ModelTierResolver;
use crate::types::{
    AttemptOutcome, GenerationConfig, GenerationReport, InferenceAttempt, InferenceRequest,
    StructuredResult,
};

const JSON_MIME: &str = "application/json";

/// The inference client. Cheap to share behind an `Arc`.
pub struct InferenceClient {
    backend: Arc<dyn InferenceBackend>,
    tiers: ModelTierResolver,
    max_tries: u32,
    backoff: BackoffPolicy,
    temperature: f32,
    timeout: Duration,
    embedding_model: String,
    embedding_task_type: String,
    log_chars: usize,
}

impl std::fmt::Debug for InferenceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceClient")
            .field("backend", &self.backend.name())
            .field("max_tries", &self.max_tries)
            .field("embedding_model", &self.embedding_model)
            .finish_non_exhaustive()
    }
}

impl InferenceClient {
    /// Create a client over an explicit backend.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Config`] if the tier table has no usable `medium`
    /// tier or `max_tries` is zero.
    pub fn new(backend: Arc<dyn InferenceBackend>, config: &LlmConfig) -> Result<Self, LlmError> {
        if config.max_tries == 0 {
            return Err(LlmError::Config("max_tries must be at least 1".into()));
        }
        Ok(Self {
            backend,
            tiers: ModelTierResolver::from_config(config)?,
            max_tries: config.max_tries,
            backoff: BackoffPolicy::from_millis(config.backoff_base_ms, config.max_backoff_ms),
            temperature: config.temperature,
            timeout: Duration::from_millis(config.request_timeout_ms),
            embedding_model: config.embedding_model.clone(),
            embedding_task_type: config.embedding_task_type.clone(),
            log_chars: config.log_truncate_chars,
        })
    }

    /// Create a client for the configured provider.
    ///
    /// `provider = "none"` yields a client whose every call fails.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Config`] for an unknown provider, a missing API key,
    /// or an invalid tier table.
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let backend: Arc<dyn InferenceBackend> = match config.provider.as_str() {
            "gemini" => Arc::new(GeminiBackend::new(
                &config.base_url,
                config.api_key()?,
                Duration::from_millis(config.request_timeout_ms),
            )?),
            "none" => Arc::new(DisabledBackend),
            other => return Err(LlmError::Config(format!("Unknown LLM provider: {other}"))),
        };
        Self::new(backend, config)
    }

    /// Name of the underlying provider.
    #[must_use]
    pub fn provider(&self) -> &str {
        self.backend.name()
    }

    /// Structured generation with tiered fallback.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::RetriesExhausted`] when no model in the tier
    /// produced a schema-valid response.
    pub async fn generate(&self, request: &InferenceRequest) -> Result<StructuredResult, LlmError> {
        let report = self.generate_with_report(request).await;
        let last_error = report
            .last_error()
            .map_or_else(|| "no models to try".to_string(), ToString::to_string);
        let attempts = u32::try_from(report.calls()).unwrap_or(u32::MAX);
        report.result.ok_or(LlmError::RetriesExhausted {
            attempts,
            last_error,
        })
    }

    /// Like [`generate`](Self::generate), then deserialize the validated value.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::RetriesExhausted`] as `generate` does, or
    /// [`LlmError::Decode`] if the value does not fit `T`.
    pub async fn generate_typed<T: DeserializeOwned>(
        &self,
        request: &InferenceRequest,
    ) -> Result<T, LlmError> {
        let result = self.generate(request).await?;
        serde_json::from_value(result.value).map_err(|e| LlmError::Decode(e.to_string()))
    }

    /// Run the full fallback loop and return every attempt made.
    pub async fn generate_with_report(&self, request: &InferenceRequest) -> GenerationReport {
        let models = self.tiers.resolve(request.difficulty());
        let schema = request.schema();
        let config = GenerationConfig {
            response_mime_type: JSON_MIME.to_string(),
            response_schema: schema.to_response_schema(),
            temperature: self.temperature,
        };

        let mut report = GenerationReport::default();
        let mut state = RetryState::new(models.len(), self.max_tries, self.backoff);

        while let Some((index, attempt)) = state.current() {
            let model = &models[index];
            info!(
                model = %model,
                attempt,
                max_tries = self.max_tries,
                difficulty = %request.difficulty(),
                schema = schema.name(),
                prompt = %truncate(request.prompt(), self.log_chars),
                "Calling model"
            );

            let mut record = InferenceAttempt {
                model: model.clone(),
                attempt,
                raw_response: None,
                parsed: None,
                outcome: AttemptOutcome::Valid,
                backoff_after: None,
            };

            match self.attempt(model, request, &config, &mut record).await {
                Ok(value) => {
                    info!(model = %model, attempt, "Received schema-valid response");
                    report.attempts.push(record);
                    report.result = Some(StructuredResult {
                        value,
                        model: model.clone(),
                        attempt,
                    });
                    return report;
                }
                Err(err) => {
                    warn!(model = %model, attempt, error = %err, "Attempt failed");
                    record.outcome = AttemptOutcome::Failed(err);
                }
            }

            match state.on_failure() {
                Transition::Retry { delay } => {
                    record.backoff_after = Some(delay);
                    report.attempts.push(record);
                    debug!(
                        model = %model,
                        delay_ms = millis(delay),
                        "Backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                Transition::FallThrough { next_model } => {
                    report.attempts.push(record);
                    warn!(
                        failed = %model,
                        next = %models[next_model],
                        "Model exhausted its attempts, falling back"
                    );
                }
                Transition::Exhausted => {
                    report.attempts.push(record);
                }
            }
        }

        warn!(
            difficulty = %request.difficulty(),
            calls = report.calls(),
            "All models exhausted without a valid response"
        );
        report
    }

    async fn attempt(
        &self,
        model: &str,
        request: &InferenceRequest,
        config: &GenerationConfig,
        record: &mut InferenceAttempt,
    ) -> Result<Value, LlmError> {
        let raw = self
            .with_timeout(self.backend.generate_content(model, request.prompt(), config))
            .await?;
        debug!(model, response = %truncate(&raw, self.log_chars), "Raw model response");

        let trimmed = raw.trim();
        if trimmed.is_empty() {
            record.raw_response = Some(raw);
            return Err(LlmError::EmptyResponse {
                model: model.to_string(),
            });
        }

        let decoded = serde_json::from_str::<Value>(strip_code_fence(trimmed));
        record.raw_response = Some(raw.clone());
        let value = decoded.map_err(|e| LlmError::Decode(e.to_string()))?;
        record.parsed = Some(value.clone());

        let validation = SchemaValidator::validate(request.schema(), &value);
        if validation.is_valid() {
            Ok(value)
        } else {
            Err(LlmError::SchemaValidation(validation.to_string()))
        }
    }

    /// Embed `text` with the configured embedding model. One call, no retry.
    ///
    /// # Errors
    ///
    /// Returns the backend's error, or [`LlmError::EmptyResponse`] if no
    /// usable vector came back.
    pub async fn embed(&self, text: &str) -> Result<Embedding, LlmError> {
        let vectors = self
            .with_timeout(self.backend.embed_content(
                &self.embedding_model,
                text,
                &self.embedding_task_type,
            ))
            .await
            .inspect_err(|err| warn!(model = %self.embedding_model, error = %err, "Embedding failed"))?;

        let vector = vectors
            .into_iter()
            .next()
            .filter(|v| !v.is_empty() && v.iter().all(|x| x.is_finite()))
            .ok_or_else(|| LlmError::EmptyResponse {
                model: self.embedding_model.clone(),
            })?;

        debug!(model = %self.embedding_model, dimensions = vector.len(), "Embedded text");
        Ok(Embedding(vector))
    }

    async fn with_timeout<T>(
        &self,
        fut: impl std::future::Future<Output = Result<T, LlmError>>,
    ) -> Result<T, LlmError> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(LlmError::Timeout(millis(self.timeout))),
        }
    }
}

/// Remove a surrounding markdown code fence (```` ```json ```` or bare
/// ```` ``` ````). Text without a fence is returned unchanged.
#[must_use]
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (`json`, `JSON`, ...) up to the first newline.
    let rest = match rest.find('\n') {
        Some(pos) if rest[..pos].chars().all(|c| c.is_ascii_alphanumeric()) => &rest[pos + 1..],
        _ => rest.strip_prefix("json").unwrap_or(rest),
    };
    rest.trim_end()
        .strip_suffix("```")
        .unwrap_or(rest)
        .trim()
}

/// Truncate to at most `max` characters on a char boundary.
#[must_use]
pub fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Whole milliseconds in `d`, saturating at `u64::MAX`.
fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
