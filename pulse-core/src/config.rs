//! Configuration for PULSE.
//!
//! Maps directly to `pulse.toml`. Every field has a default, so an empty file
//! is a valid configuration. The remote API credential never lives in the
//! file; it is read from the environment variable named by
//! [`LlmConfig::api_key_env`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{PulseError, Result};

/// Difficulty whose tier every unknown difficulty falls back to.
pub const FALLBACK_DIFFICULTY: &str = "medium";

/// Top-level PULSE configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PulseConfig {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Remote inference API settings.
    #[serde(default)]
    pub llm: LlmConfig,
    /// Similarity retrieval settings.
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    /// Notification store settings.
    #[serde(default)]
    pub persistence: PersistenceConfig,
    /// Ingress deny-lists.
    #[serde(default)]
    pub filter: FilterConfig,
    /// Outbound push webhook.
    #[serde(default)]
    pub push: PushConfig,
    /// Log output settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl PulseConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `PulseError::Config` if the TOML is invalid or fails
    /// [`PulseConfig::validate`].
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Self = toml::from_str(toml_str).map_err(|e| PulseError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Apply `PULSE_*` overrides from the process environment.
    ///
    /// # Errors
    /// Returns `PulseError::Config` if an override has an unparseable value.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_with(|key| std::env::var(key).ok())
    }

    /// Apply overrides using an arbitrary key lookup.
    ///
    /// Recognised keys: `PULSE_MAX_TRIES`, `PULSE_BIND`, `PULSE_DATABASE`.
    ///
    /// # Errors
    /// Returns `PulseError::Config` if an override has an unparseable value.
    pub fn apply_overrides_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("PULSE_MAX_TRIES") {
            self.llm.max_tries = raw
                .trim()
                .parse()
                .map_err(|_| PulseError::Config(format!("PULSE_MAX_TRIES is not a number: '{raw}'")))?;
        }
        if let Some(bind) = lookup("PULSE_BIND") {
            self.server.bind = bind;
        }
        if let Some(db) = lookup("PULSE_DATABASE") {
            self.persistence.database = db;
        }
        self.validate()
    }

    /// Check cross-field invariants.
    ///
    /// # Errors
    /// Returns `PulseError::Config` describing the first violated rule.
    pub fn validate(&self) -> Result<()> {
        if self.llm.max_tries == 0 {
            return Err(PulseError::Config("llm.max_tries must be at least 1".into()));
        }
        match self.llm.tiers.get(FALLBACK_DIFFICULTY) {
            Some(models) if !models.is_empty() => {}
            _ => {
                return Err(PulseError::Config(format!(
                    "llm.tiers must define a non-empty '{FALLBACK_DIFFICULTY}' tier"
                )));
            }
        }
        if !(-1.0..=1.0).contains(&self.retrieval.threshold) {
            return Err(PulseError::Config(format!(
                "retrieval.threshold must lie in [-1, 1], got {}",
                self.retrieval.threshold
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address to bind.
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: default_bind() }
    }
}

/// Remote inference API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider: "gemini" or "none".
    #[serde(default = "default_gemini")]
    pub provider: String,
    /// Base URL of the Generative Language API.
    #[serde(default = "default_gemini_url")]
    pub base_url: String,
    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Fixed model used for embeddings.
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    /// Task-type hint sent with embedding requests.
    #[serde(default = "default_task_type")]
    pub embedding_task_type: String,
    /// Sampling temperature for structured generation.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Attempts per model before falling through to the next one.
    #[serde(default = "default_3")]
    pub max_tries: u32,
    /// Backoff unit; the n-th consecutive failure sleeps `base * 2^n`.
    #[serde(default = "default_1000")]
    pub backoff_base_ms: u64,
    /// Upper bound on a single backoff sleep.
    #[serde(default = "default_60000")]
    pub max_backoff_ms: u64,
    /// Hard timeout for any remote call in milliseconds.
    #[serde(default = "default_30000")]
    pub request_timeout_ms: u64,
    /// Prompt/response characters kept in log lines.
    #[serde(default = "default_500")]
    pub log_truncate_chars: usize,
    /// Ordered candidate models per difficulty, most preferred first.
    #[serde(default = "default_tiers")]
    pub tiers: BTreeMap<String, Vec<String>>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_gemini(),
            base_url: default_gemini_url(),
            api_key_env: default_api_key_env(),
            embedding_model: default_embedding_model(),
            embedding_task_type: default_task_type(),
            temperature: default_temperature(),
            max_tries: 3,
            backoff_base_ms: 1000,
            max_backoff_ms: 60_000,
            request_timeout_ms: 30_000,
            log_truncate_chars: 500,
            tiers: default_tiers(),
        }
    }
}

impl LlmConfig {
    /// Read the API key from the configured environment variable.
    ///
    /// # Errors
    /// Returns `PulseError::Config` if the variable is unset or empty.
    pub fn api_key(&self) -> Result<String> {
        match std::env::var(&self.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(PulseError::Config(format!(
                "environment variable {} is not set",
                self.api_key_env
            ))),
        }
    }
}

/// Similarity retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Minimum cosine similarity for a record to be returned.
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    /// Optional cap on the number of ranked results.
    #[serde(default)]
    pub max_results: Option<usize>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            max_results: None,
        }
    }
}

/// Notification store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database")]
    pub database: String,
    /// Use WAL mode so retrieval reads don't block ingest writes.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
    /// SQLite busy timeout in milliseconds.
    #[serde(default = "default_5000")]
    pub busy_timeout_ms: u64,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
            wal_mode: true,
            busy_timeout_ms: 5000,
        }
    }
}

/// Ingress deny-lists. Matching is exact and case-sensitive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Channels whose notifications are ignored.
    #[serde(default = "default_ignore_channels")]
    pub ignore_channels: Vec<String>,
    /// Apps whose notifications are ignored.
    #[serde(default = "default_ignore_apps")]
    pub ignore_apps: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            ignore_channels: default_ignore_channels(),
            ignore_apps: default_ignore_apps(),
        }
    }
}

/// Outbound push webhook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushConfig {
    /// Webhook URL; push is disabled when unset.
    #[serde(default)]
    pub url: Option<String>,
    /// Title used when the caller supplies none.
    #[serde(default = "default_push_title")]
    pub default_title: String,
    /// Timeout for the webhook call in milliseconds.
    #[serde(default = "default_10000")]
    pub timeout_ms: u64,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            url: None,
            default_title: default_push_title(),
            timeout_ms: 10_000,
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level or filter directive; `RUST_LOG` takes precedence.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Serde default helpers
// ---------------------------------------------------------------------------

fn default_true() -> bool { true }
fn default_bind() -> String { "0.0.0.0:8080".to_string() }
fn default_gemini() -> String { "gemini".to_string() }
fn default_gemini_url() -> String { "https://generativelanguage.googleapis.com".to_string() }
fn default_api_key_env() -> String { "GEMINI_API_KEY".to_string() }
fn default_embedding_model() -> String { "gemini-embedding-exp-03-07".to_string() }
fn default_task_type() -> String { "RETRIEVAL_QUERY".to_string() }
fn default_database() -> String { "notifications.db".to_string() }
fn default_push_title() -> String { "Notification".to_string() }
fn default_log_level() -> String { "info".to_string() }
fn default_temperature() -> f32 { 0.01 }
fn default_threshold() -> f64 { 0.8 }
fn default_3() -> u32 { 3 }
fn default_500() -> usize { 500 }
fn default_1000() -> u64 { 1000 }
fn default_5000() -> u64 { 5000 }
fn default_10000() -> u64 { 10_000 }
fn default_30000() -> u64 { 30_000 }
fn default_60000() -> u64 { 60_000 }

fn default_ignore_channels() -> Vec<String> {
    vec!["NETWORK_ALERTS".to_string(), "CHR".to_string()]
}

fn default_ignore_apps() -> Vec<String> {
    vec!["Instagram".to_string()]
}

fn default_tiers() -> BTreeMap<String, Vec<String>> {
    let tier = |models: &[&str]| models.iter().map(|m| (*m).to_string()).collect::<Vec<_>>();
    BTreeMap::from([
        ("easy".to_string(), tier(&["gemini-2.0-flash-lite", "gemini-2.0-flash"])),
        ("medium".to_string(), tier(&["gemini-2.0-flash", "gemini-2.5-flash"])),
        ("hard".to_string(), tier(&["gemini-2.5-pro", "gemini-2.5-flash"])),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let config = PulseConfig::from_toml("").expect("empty config is valid");
        assert_eq!(config.server.bind, "0.0.0.0:8080");
        assert_eq!(config.llm.max_tries, 3);
        assert!((config.retrieval.threshold - 0.8).abs() < f64::EPSILON);
        assert_eq!(config.filter.ignore_channels, vec!["NETWORK_ALERTS", "CHR"]);
        assert_eq!(config.filter.ignore_apps, vec!["Instagram"]);
        assert!(config.push.url.is_none());
        assert_eq!(config.llm.tiers["medium"].len(), 2);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = PulseConfig::from_toml(
            r#"
            [llm]
            max_tries = 5

            [llm.tiers]
            medium = ["model-a"]
            "#,
        )
        .expect("parse");
        assert_eq!(config.llm.max_tries, 5);
        assert_eq!(config.llm.backoff_base_ms, 1000);
        assert_eq!(config.llm.tiers.len(), 1, "explicit table replaces the default tiers");
    }

    #[test]
    fn missing_medium_tier_is_rejected() {
        let err = PulseConfig::from_toml(
            r#"
            [llm.tiers]
            hard = ["model-a"]
            "#,
        )
        .expect_err("should fail");
        assert!(matches!(err, PulseError::Config(msg) if msg.contains("medium")));
    }

    #[test]
    fn zero_tries_is_rejected() {
        assert!(PulseConfig::from_toml("[llm]\nmax_tries = 0").is_err());
    }

    #[test]
    fn out_of_range_threshold_is_rejected() {
        assert!(PulseConfig::from_toml("[retrieval]\nthreshold = 1.5").is_err());
    }

    #[test]
    fn overrides_apply_from_lookup() {
        let mut config = PulseConfig::default();
        config
            .apply_overrides_with(|key| match key {
                "PULSE_MAX_TRIES" => Some("7".to_string()),
                "PULSE_BIND" => Some("127.0.0.1:9999".to_string()),
                _ => None,
            })
            .expect("overrides");
        assert_eq!(config.llm.max_tries, 7);
        assert_eq!(config.server.bind, "127.0.0.1:9999");
        assert_eq!(config.persistence.database, "notifications.db");
    }

    #[test]
    fn bad_override_is_reported() {
        let mut config = PulseConfig::default();
        let err = config
            .apply_overrides_with(|key| (key == "PULSE_MAX_TRIES").then(|| "many".to_string()))
            .expect_err("should fail");
        assert!(matches!(err, PulseError::Config(_)));
    }
}
