//! HTTP API tests against an in-memory store and a stub embedding backend.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use parking_lot::Mutex;
use tower::ServiceExt;

use pulse_core::config::PulseConfig;
use pulse_core::persistence::NotificationStore;
use pulse_llm::types::GenerationConfig;
use pulse_llm::{InferenceBackend, InferenceClient, LlmError};
use pulse_server::api::{HealthResponse, SearchResponse, IGNORED, RECEIVED};
use pulse_server::{router, AppState};

// ---------------------------------------------------------------------------
// Stub backend: embeds by keyword so similarity is predictable.
// ---------------------------------------------------------------------------

#[derive(Default)]
struct KeywordEmbedder {
    embedded: Mutex<Vec<String>>,
    fail: bool,
}

#[async_trait]
impl InferenceBackend for KeywordEmbedder {
    fn name(&self) -> &str {
        "keyword"
    }

    async fn generate_content(
        &self,
        _model: &str,
        _prompt: &str,
        _config: &GenerationConfig,
    ) -> Result<String, LlmError> {
        Err(LlmError::Unavailable("not used".into()))
    }

    async fn embed_content(
        &self,
        _model: &str,
        text: &str,
        _task_type: &str,
    ) -> Result<Vec<Vec<f32>>, LlmError> {
        self.embedded.lock().push(text.to_string());
        if self.fail {
            return Err(LlmError::Transport("embedding service down".into()));
        }
        let lower = text.to_lowercase();
        let vector = vec![
            if lower.contains("bank") { 1.0 } else { 0.0 },
            if lower.contains("meeting") { 1.0 } else { 0.0 },
            0.1,
        ];
        Ok(vec![vector])
    }
}

struct Harness {
    app: Router,
    store: NotificationStore,
    backend: Arc<KeywordEmbedder>,
}

fn harness_with(backend: KeywordEmbedder) -> Harness {
    let config = PulseConfig::default();
    let backend = Arc::new(backend);
    let client = InferenceClient::new(backend.clone(), &config.llm).expect("client");
    let store = NotificationStore::open_in_memory().expect("store");
    let state = AppState::new(store.clone(), Arc::new(client), &config);
    Harness {
        app: router(state),
        store,
        backend,
    }
}

fn harness() -> Harness {
    harness_with(KeywordEmbedder::default())
}

async fn post_send(app: &Router, body: &str) -> (StatusCode, String) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/send")
                .body(Body::from(body.to_string()))
                .expect("request"),
        )
        .await
        .expect("response");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    (status, String::from_utf8(bytes.to_vec()).expect("utf8"))
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).expect("request"))
        .await
        .expect("response");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    (status, bytes.to_vec())
}

// ---------------------------------------------------------------------------
// POST /send
// ---------------------------------------------------------------------------

#[tokio::test]
async fn empty_body_is_rejected() {
    let h = harness();
    let (status, body) = post_send(&h.app, "").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "No data received");
    assert!(h.backend.embedded.lock().is_empty());
}

#[tokio::test]
async fn undecodable_body_is_rejected_without_embedding() {
    let h = harness();
    let (status, _) = post_send(&h.app, "{not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = post_send(&h.app, r#"{"app":"Mail"}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("channel"));

    assert!(h.backend.embedded.lock().is_empty());
    assert_eq!(h.store.count().expect("count"), 0);
}

#[tokio::test]
async fn denied_channel_and_app_are_ignored_without_embedding() {
    let h = harness();
    for body in [
        r#"{"channel":"CHR","app":"X"}"#,
        r#"{"channel":"NETWORK_ALERTS","app":"System UI"}"#,
        r#"{"channel":"feed","app":"Instagram"}"#,
    ] {
        let (status, reply) = post_send(&h.app, body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(reply, IGNORED);
    }
    assert!(h.backend.embedded.lock().is_empty());
    assert_eq!(h.store.count().expect("count"), 0);
}

#[tokio::test]
async fn accepted_notification_is_embedded_and_stored() {
    let h = harness();
    let body = "{\"channel\":\"alerts\",\"app\":\"MyBank\",\"text\":\"Bank transfer\nreceived\"}";

    let (status, reply) = post_send(&h.app, body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply, RECEIVED);
    let stored = h.store.list().expect("list");
    assert_eq!(stored.len(), 1);
    assert!(stored[0].content.contains("Bank transfer\\nreceived"));
    assert_eq!(h.backend.embedded.lock().as_slice(), [stored[0].content.clone()]);
}

#[tokio::test]
async fn pretty_printed_notification_is_accepted_as_sent() {
    let h = harness();
    let body = "{\n  \"channel\": \"mail\",\n  \"app\": \"Gmail\"\n}";

    let (status, reply) = post_send(&h.app, body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply, RECEIVED);
    let stored = h.store.list().expect("list");
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].content, body);
    assert_eq!(h.backend.embedded.lock().as_slice(), [body.to_string()]);
}

#[tokio::test]
async fn non_object_payload_is_rejected() {
    let h = harness();
    let (status, reply) = post_send(&h.app, "[1, 2]").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(reply.contains("JSON object"));
    assert_eq!(h.store.count().expect("count"), 0);
}

#[tokio::test]
async fn embedding_failure_still_acknowledges_but_stores_nothing() {
    let h = harness_with(KeywordEmbedder {
        fail: true,
        ..KeywordEmbedder::default()
    });
    let (status, reply) = post_send(&h.app, r#"{"channel":"mail","app":"Gmail"}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply, RECEIVED);
    assert_eq!(h.backend.embedded.lock().len(), 1);
    assert_eq!(h.store.count().expect("count"), 0);
}

// ---------------------------------------------------------------------------
// GET /search, GET /health
// ---------------------------------------------------------------------------

#[tokio::test]
async fn search_ranks_stored_notifications() {
    let h = harness();
    post_send(&h.app, r#"{"channel":"a","app":"MyBank","text":"bank alert"}"#).await;
    post_send(&h.app, r#"{"channel":"b","app":"Calendar","text":"meeting at 3"}"#).await;

    let (status, body) = get(&h.app, "/search?q=bank&threshold=0.9").await;
    assert_eq!(status, StatusCode::OK);

    let response: SearchResponse = serde_json::from_slice(&body).expect("json");
    assert_eq!(response.query, "bank");
    assert!((response.threshold - 0.9).abs() < f64::EPSILON);
    assert_eq!(response.results.len(), 1);
    assert!(response.results[0].content.contains("bank alert"));
    assert!(response.results[0].similarity > 0.99);
}

#[tokio::test]
async fn search_rejects_bad_parameters() {
    let h = harness();
    assert_eq!(get(&h.app, "/search?q=").await.0, StatusCode::BAD_REQUEST);
    assert_eq!(get(&h.app, "/search?q=x&threshold=1.5").await.0, StatusCode::BAD_REQUEST);
    assert_eq!(get(&h.app, "/search").await.0, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn search_reports_embedding_failure_as_bad_gateway() {
    let h = harness_with(KeywordEmbedder {
        fail: true,
        ..KeywordEmbedder::default()
    });
    let (status, body) = get(&h.app, "/search?q=bank").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    let json: serde_json::Value = serde_json::from_slice(&body).expect("json");
    assert_eq!(json["code"], "upstream_error");
}

#[tokio::test]
async fn health_reports_notification_count() {
    let h = harness();
    post_send(&h.app, r#"{"channel":"mail","app":"Gmail","text":"hello"}"#).await;

    let (status, body) = get(&h.app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    let health: HealthResponse = serde_json::from_slice(&body).expect("json");
    assert_eq!(health.status, "ok");
    assert_eq!(health.notifications, 1);
    assert!(!health.version.is_empty());
}
