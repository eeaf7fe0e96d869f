//! Shared server state.

use std::sync::Arc;

use pulse_core::config::PulseConfig;
use pulse_core::filter::IngressFilter;
use pulse_core::persistence::NotificationStore;
use pulse_core::retrieval::RetrievalEngine;
use pulse_llm::InferenceClient;

/// Everything a request handler needs. Cloned per request.
#[derive(Clone)]
pub struct AppState {
    store: NotificationStore,
    client: Arc<InferenceClient>,
    filter: Arc<IngressFilter>,
    retrieval: Arc<RetrievalEngine>,
}

impl AppState {
    /// Assemble state from its parts.
    #[must_use]
    pub fn new(store: NotificationStore, client: Arc<InferenceClient>, config: &PulseConfig) -> Self {
        Self {
            store,
            client,
            filter: Arc::new(IngressFilter::new(&config.filter)),
            retrieval: Arc::new(RetrievalEngine::new(config.retrieval.clone())),
        }
    }

    /// Notification store handle.
    #[must_use]
    pub fn store(&self) -> &NotificationStore {
        &self.store
    }

    /// Inference client.
    #[must_use]
    pub fn client(&self) -> &InferenceClient {
        &self.client
    }

    /// Ingress deny-lists.
    #[must_use]
    pub fn filter(&self) -> &IngressFilter {
        &self.filter
    }

    /// Retrieval engine.
    #[must_use]
    pub fn retrieval(&self) -> &RetrievalEngine {
        &self.retrieval
    }
}
