//! Gemini REST backend (`generateContent` / `embedContent`).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::backend::InferenceBackend;
use crate::error::LlmError;
use crate::types::GenerationConfig;

const API_VERSION: &str = "v1beta";

/// Talks to the Gemini API over HTTPS.
pub struct GeminiBackend {
    http: Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
}

impl std::fmt::Debug for GeminiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiBackend")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl GeminiBackend {
    /// Create a backend with a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Config`] if the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Config(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            timeout,
        })
    }

    fn endpoint(&self, model: &str, method: &str) -> String {
        format!("{}/{API_VERSION}/models/{model}:{method}", self.base_url)
    }

    async fn post<B: Serialize + Sync>(&self, url: &str, body: &B) -> Result<Value, LlmError> {
        let resp = self
            .http
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| LlmError::from_reqwest(&e, self.timeout))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(%status, url, "Gemini API returned error");
            return Err(LlmError::Transport(format!("HTTP {status}: {text}")));
        }

        resp.json::<Value>()
            .await
            .map_err(|e| LlmError::Transport(format!("invalid response body: {e}")))
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: WireGenerationConfig<'a>,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireGenerationConfig<'a> {
    response_mime_type: &'a str,
    response_schema: &'a Value,
    temperature: f32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedRequest<'a> {
    content: Content<'a>,
    task_type: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Option<Values>,
    #[serde(default)]
    embeddings: Vec<Values>,
}

#[derive(Deserialize)]
struct Values {
    #[serde(default)]
    values: Vec<f32>,
}

/// Concatenate the text parts of the first candidate. Empty when absent.
pub(crate) fn extract_text(body: Value) -> Result<String, LlmError> {
    let resp: GenerateResponse =
        serde_json::from_value(body).map_err(|e| LlmError::Transport(e.to_string()))?;
    Ok(resp
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default())
}

/// Pull vectors out of either the single or batched response shape.
pub(crate) fn extract_vectors(body: Value) -> Result<Vec<Vec<f32>>, LlmError> {
    let resp: EmbedResponse =
        serde_json::from_value(body).map_err(|e| LlmError::Transport(e.to_string()))?;
    let mut vectors: Vec<Vec<f32>> = resp.embedding.into_iter().map(|v| v.values).collect();
    vectors.extend(resp.embeddings.into_iter().map(|v| v.values));
    Ok(vectors)
}

#[async_trait]
impl InferenceBackend for GeminiBackend {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate_content(
        &self,
        model: &str,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<String, LlmError> {
        let body = GenerateRequest {
            contents: [Content {
                role: Some("user"),
                parts: [Part { text: prompt }],
            }],
            generation_config: WireGenerationConfig {
                response_mime_type: &config.response_mime_type,
                response_schema: &config.response_schema,
                temperature: config.temperature,
            },
        };
        let json = self.post(&self.endpoint(model, "generateContent"), &body).await?;
        extract_text(json)
    }

    async fn embed_content(
        &self,
        model: &str,
        text: &str,
        task_type: &str,
    ) -> Result<Vec<Vec<f32>>, LlmError> {
        let body = EmbedRequest {
            content: Content {
                role: None,
                parts: [Part { text }],
            },
            task_type,
        };
        let json = self.post(&self.endpoint(model, "embedContent"), &body).await?;
        extract_vectors(json)
    }
}
