//! Pipeline flows driven through a scripted backend.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use pulse_core::config::PulseConfig;
use pulse_core::persistence::NotificationStore;
use pulse_llm::prompt::PromptTemplate;
use pulse_llm::types::GenerationConfig;
use pulse_llm::{Difficulty, InferenceBackend, InferenceClient, LlmError};
use pulse_server::pipeline::{self, PipelineError};
use pulse_server::AppState;

/// Embeds by keyword and answers every generation call with `reply`.
struct ScriptedBackend {
    reply: String,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            prompts: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl InferenceBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate_content(
        &self,
        _model: &str,
        prompt: &str,
        _config: &GenerationConfig,
    ) -> Result<String, LlmError> {
        self.prompts.lock().push(prompt.to_string());
        Ok(self.reply.clone())
    }

    async fn embed_content(
        &self,
        _model: &str,
        text: &str,
        _task_type: &str,
    ) -> Result<Vec<Vec<f32>>, LlmError> {
        let bank = if text.to_lowercase().contains("bank") { 1.0 } else { 0.0 };
        Ok(vec![vec![bank, 1.0 - bank]])
    }
}

fn state(backend: Arc<ScriptedBackend>) -> AppState {
    let mut config = PulseConfig::default();
    config.llm.max_tries = 1;
    let client = InferenceClient::new(backend, &config.llm).expect("client");
    let store = NotificationStore::open_in_memory().expect("store");
    AppState::new(store, Arc::new(client), &config)
}

#[tokio::test]
async fn digest_returns_typed_summary_over_related_notifications() {
    let backend = ScriptedBackend::replying(
        "```json\n{\"reasoning\":\"one bank alert\",\"summary\":\"Your bank sent a transfer notice.\",\
         \"highlights\":[\"transfer received\"],\"urgency\":\"normal\"}\n```",
    );
    let state = state(backend.clone());
    pipeline::ingest(&state, r#"{"app":"MyBank","text":"bank transfer"}"#.into())
        .await
        .expect("ingest");
    pipeline::ingest(&state, r#"{"app":"Calendar","text":"standup"}"#.into())
        .await
        .expect("ingest");

    let digest = pipeline::digest(
        &state,
        &PromptTemplate::builtin_digest(),
        "bank",
        0.9,
        Difficulty::Medium,
    )
    .await
    .expect("digest");

    assert_eq!(digest.summary, "Your bank sent a transfer notice.");
    assert_eq!(digest.highlights, ["transfer received"]);
    assert_eq!(digest.urgency, "normal");

    let prompts = backend.prompts.lock();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("bank transfer"));
    assert!(!prompts[0].contains("standup"));
}

#[tokio::test]
async fn digest_reply_off_contract_is_a_generation_error() {
    let backend = ScriptedBackend::replying(r#"{"summary":"missing the rest"}"#);
    let state = state(backend.clone());

    let err = pipeline::digest(
        &state,
        &PromptTemplate::builtin_digest(),
        "anything",
        0.0,
        Difficulty::Medium,
    )
    .await
    .expect_err("invalid every time");

    assert!(matches!(
        err,
        PipelineError::Generation(LlmError::RetriesExhausted { .. })
    ));
    assert!(!backend.prompts.lock().is_empty());
}
