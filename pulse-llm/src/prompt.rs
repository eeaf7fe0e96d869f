//! Prompt templates for PULSE inference calls.
//!
//! Every prompt is a versioned, testable artifact. The built-in digest
//! template is compiled in; a replacement can be loaded from a TOML file
//! with a `[prompt]` section.

use std::path::Path;

use pulse_core::types::ScoredResult;
use serde::Deserialize;

use crate::error::LlmError;
use crate::schema::{FieldKind, OutputSchema};
use crate::types::{Difficulty, InferenceRequest};

/// Digest prompt: who the model is and how it should answer.
pub const DIGEST_SYSTEM: &str = r"You are a personal notification assistant.
You read the phone notifications a user received and explain what matters.

RULES:
- Only use the notifications provided. Never invent senders, amounts, or dates.
- Think step by step in the reasoning field before writing the summary.
- Urgency is high only for time-critical items (codes, deadlines, alerts).
- Your response must be valid JSON.";

/// Digest prompt: the question and the retrieved notifications.
pub const DIGEST_USER: &str = r#"Question: {query}

Related notifications (most similar first):
{notifications_formatted}

Return JSON:
{{"reasoning": "your step-by-step thinking", "summary": "one short paragraph", "highlights": ["key point", ...], "urgency": "low" | "normal" | "high"}}"#;

/// Placeholder used when retrieval found nothing.
pub const NO_NOTIFICATIONS: &str = "(no related notifications)";

/// Simple template interpolation for prompts.
///
/// Replaces `{key}` with the corresponding value.
#[must_use]
pub fn render_template(template: &str, vars: &[(&str, &str)]) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        result = result.replace(&format!("{{{key}}}"), value);
    }
    result
}

/// Render retrieval hits as a bullet list for prompt context.
#[must_use]
pub fn format_notifications(results: &[ScoredResult]) -> String {
    if results.is_empty() {
        return NO_NOTIFICATIONS.to_string();
    }
    results
        .iter()
        .map(|r| format!("- [#{} similarity {:.2}] {}", r.id, r.similarity, r.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Contract for the digest response.
#[must_use]
pub fn digest_schema() -> OutputSchema {
    OutputSchema::new("Digest")
        .field("reasoning", FieldKind::String)
        .field("summary", FieldKind::String)
        .field("highlights", FieldKind::array_of(FieldKind::String))
        .field("urgency", FieldKind::one_of(&["low", "normal", "high"]))
}

// ---------------------------------------------------------------------------
// PromptTemplate — TOML-loadable system/user pair
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
struct TomlPromptFile {
    prompt: TomlPromptData,
}

#[derive(Debug, Clone, Deserialize)]
struct TomlPromptData {
    #[serde(default = "default_version")]
    version: String,
    system: String,
    user: String,
}

fn default_version() -> String {
    "1".to_string()
}

/// A loaded, ready-to-render prompt template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    /// Prompt version string (e.g., "1.0").
    pub version: String,
    /// System prompt template (contains `{key}` placeholders).
    pub system: String,
    /// User prompt template (contains `{key}` placeholders).
    pub user: String,
}

impl PromptTemplate {
    /// The compiled-in digest template.
    #[must_use]
    pub fn builtin_digest() -> Self {
        Self {
            version: "builtin".into(),
            system: DIGEST_SYSTEM.into(),
            user: DIGEST_USER.into(),
        }
    }

    /// Parse a `[prompt]` TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Config`] if the document is malformed.
    pub fn from_toml(toml_str: &str) -> Result<Self, LlmError> {
        let file: TomlPromptFile =
            toml::from_str(toml_str).map_err(|e| LlmError::Config(format!("invalid prompt file: {e}")))?;
        Ok(Self {
            version: file.prompt.version,
            system: file.prompt.system,
            user: file.prompt.user,
        })
    }

    /// Load a `[prompt]` TOML file from disk.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Config`] if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LlmError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| LlmError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml(&content)
    }

    /// Render system and user parts, joined by a blank line.
    #[must_use]
    pub fn render(&self, vars: &[(&str, &str)]) -> String {
        format!(
            "{}\n\n{}",
            render_template(&self.system, vars),
            render_template(&self.user, vars)
        )
    }

    /// Build the digest request for `query` over retrieval hits.
    #[must_use]
    pub fn digest_request(
        &self,
        query: &str,
        results: &[ScoredResult],
        difficulty: Difficulty,
    ) -> InferenceRequest {
        let formatted = format_notifications(results);
        let prompt = self.render(&[("query", query), ("notifications_formatted", &formatted)]);
        InferenceRequest::new(prompt, difficulty, digest_schema())
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::builtin_digest()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_core::types::NotificationId;

    #[test]
    fn template_rendering_works() {
        let rendered = render_template(
            "Hello {name}, you have {count} alerts.",
            &[("name", "Ada"), ("count", "3")],
        );
        assert_eq!(rendered, "Hello Ada, you have 3 alerts.");
    }

    #[test]
    fn template_handles_missing_vars() {
        let rendered = render_template("Hello {name}, {unknown}.", &[("name", "Ada")]);
        assert_eq!(rendered, "Hello Ada, {unknown}.");
    }

    #[test]
    fn notifications_are_formatted_in_rank_order() {
        let results = vec![
            ScoredResult { id: NotificationId(7), content: "OTP 1234".into(), similarity: 0.93 },
            ScoredResult { id: NotificationId(2), content: "Card charged".into(), similarity: 0.81 },
        ];
        let text = format_notifications(&results);
        assert_eq!(text, "- [#7 similarity 0.93] OTP 1234\n- [#2 similarity 0.81] Card charged");
        assert_eq!(format_notifications(&[]), NO_NOTIFICATIONS);
    }

    #[test]
    fn digest_request_fills_every_placeholder() {
        let request = PromptTemplate::builtin_digest().digest_request("any bank alerts?", &[], Difficulty::Hard);
        assert!(request.prompt().contains("any bank alerts?"));
        assert!(request.prompt().contains(NO_NOTIFICATIONS));
        assert!(!request.prompt().contains("{query}"));
        assert!(request.prompt().contains(r#"{"reasoning""#));
        assert_eq!(request.difficulty(), Difficulty::Hard);
        assert_eq!(request.schema().name(), "Digest");
    }

    #[test]
    fn template_loads_from_toml() {
        let template = PromptTemplate::from_toml(
            r#"
            [prompt]
            version = "2"
            system = "You summarise."
            user = "Q: {query}"
            "#,
        )
        .expect("parse");
        assert_eq!(template.version, "2");
        assert_eq!(template.render(&[("query", "x")]), "You summarise.\n\nQ: x");
    }

    #[test]
    fn malformed_template_is_a_config_error() {
        assert!(matches!(PromptTemplate::from_toml("[prompt]\nsystem = 1"), Err(LlmError::Config(_))));
        assert!(PromptTemplate::from_file("/nonexistent/pulse/prompt.toml").is_err());
    }
}
