//! Outbound push delivery over a simple HTTP GET endpoint.
//!
//! The endpoint receives `pushTitle` and `pushText` query parameters.
//! Delivery is best effort: failures are logged and reported as `false`,
//! never raised.

use std::time::Duration;

use pulse_core::config::PushConfig;
use reqwest::Client;
use tracing::{debug, warn};

/// Sends push messages to the configured endpoint.
#[derive(Debug, Clone)]
pub struct PushNotifier {
    http: Client,
    url: Option<String>,
    default_title: String,
}

impl PushNotifier {
    /// Build from `[push]`. A missing URL yields a disabled notifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &PushConfig) -> reqwest::Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        Ok(Self {
            http,
            url: config.url.clone().filter(|u| !u.trim().is_empty()),
            default_title: config.default_title.clone(),
        })
    }

    /// Whether a URL is configured.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.url.is_some()
    }

    /// Deliver one message. Returns `true` on a 2xx reply.
    pub async fn send(&self, title: Option<&str>, message: &str) -> bool {
        let Some(url) = &self.url else {
            debug!("Push disabled, no url configured");
            return false;
        };
        let title = title.unwrap_or(&self.default_title);

        let result = self
            .http
            .get(url)
            .query(&[("pushTitle", title), ("pushText", message)])
            .send()
            .await;

        match result {
            Ok(resp) if resp.status().is_success() => {
                debug!(status = %resp.status(), "Push delivered");
                true
            }
            Ok(resp) => {
                warn!(status = %resp.status(), "Push endpoint returned error");
                false
            }
            Err(err) => {
                warn!(error = %err, "Push request failed");
                false
            }
        }
    }
}
