//! Ingress decoding and deny-list filtering for incoming notifications.
//!
//! Runs before any remote call: a payload that fails to decode, or that comes
//! from a denied channel or app, never reaches the embedding client.

use std::collections::HashSet;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::config::FilterConfig;

/// Why an ingress payload was rejected as malformed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IngressError {
    /// The request body was empty.
    #[error("No data received")]
    Empty,

    /// The body was not valid JSON.
    #[error("Malformed notification payload: {0}")]
    Decode(String),

    /// The body decoded, but to something other than a JSON object.
    #[error("Notification payload must be a JSON object")]
    NotAnObject,

    /// The body decoded, but lacks a required string field.
    #[error("Notification payload is missing string field '{0}'")]
    MissingField(&'static str),
}

/// A decoded notification event.
#[derive(Debug, Clone, PartialEq)]
pub struct IngressEvent {
    /// Notification channel reported by the device.
    pub channel: String,
    /// Originating app reported by the device.
    pub app: String,
    /// Body text that decoded; this is what gets embedded and stored.
    pub raw: String,
    /// The full decoded object.
    pub payload: Map<String, Value>,
}

impl IngressEvent {
    /// Decode a raw request body.
    ///
    /// The body is decoded as sent. If that fails, literal newlines and
    /// carriage returns are escaped and decoding is retried, so multi-line
    /// notification texts inside JSON strings still decode. `raw` holds
    /// whichever text decoded.
    ///
    /// # Errors
    ///
    /// Returns [`IngressError`] if the body is empty, does not decode either
    /// way, is not a JSON object, or lacks string `channel` / `app` fields.
    pub fn parse(body: &str) -> Result<Self, IngressError> {
        if body.is_empty() {
            return Err(IngressError::Empty);
        }

        let (raw, value) = match serde_json::from_str::<Value>(body) {
            Ok(value) => (body.to_string(), value),
            Err(_) => {
                let escaped = sanitize(body);
                let value = serde_json::from_str::<Value>(&escaped)
                    .map_err(|e| IngressError::Decode(e.to_string()))?;
                (escaped, value)
            }
        };
        let Value::Object(payload) = value else {
            return Err(IngressError::NotAnObject);
        };

        let channel = string_field(&payload, "channel")?;
        let app = string_field(&payload, "app")?;

        Ok(Self {
            channel,
            app,
            raw,
            payload,
        })
    }
}

fn string_field(payload: &Map<String, Value>, name: &'static str) -> Result<String, IngressError> {
    payload
        .get(name)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(IngressError::MissingField(name))
}

/// Escape raw line breaks so they survive JSON decoding inside strings.
#[must_use]
pub fn sanitize(body: &str) -> String {
    body.replace('\n', "\\n").replace('\r', "\\r")
}

/// Outcome of running an event through the [`IngressFilter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterDecision {
    /// Continue to embedding and persistence.
    Accept,
    /// The event's channel is on the deny-list.
    IgnoredChannel,
    /// The event's app is on the deny-list.
    IgnoredApp,
}

impl FilterDecision {
    /// Whether the event should be processed further.
    #[must_use]
    pub fn is_accepted(self) -> bool {
        matches!(self, Self::Accept)
    }
}

/// Channel and app deny-sets.
#[derive(Debug, Clone, Default)]
pub struct IngressFilter {
    ignore_channels: HashSet<String>,
    ignore_apps: HashSet<String>,
}

impl IngressFilter {
    /// Build a filter from configuration.
    #[must_use]
    pub fn new(config: &FilterConfig) -> Self {
        Self {
            ignore_channels: config.ignore_channels.iter().cloned().collect(),
            ignore_apps: config.ignore_apps.iter().cloned().collect(),
        }
    }

    /// Decide whether `event` passes the deny-lists.
    #[must_use]
    pub fn check(&self, event: &IngressEvent) -> FilterDecision {
        if self.ignore_channels.contains(&event.channel) {
            FilterDecision::IgnoredChannel
        } else if self.ignore_apps.contains(&event.app) {
            FilterDecision::IgnoredApp
        } else {
            FilterDecision::Accept
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> IngressFilter {
        IngressFilter::new(&FilterConfig::default())
    }

    #[test]
    fn empty_body_is_rejected() {
        assert_eq!(IngressEvent::parse(""), Err(IngressError::Empty));
    }

    #[test]
    fn undecodable_body_is_rejected() {
        assert!(matches!(IngressEvent::parse("not json at all"), Err(IngressError::Decode(_))));
    }

    #[test]
    fn non_object_is_rejected() {
        assert_eq!(IngressEvent::parse("[1, 2]"), Err(IngressError::NotAnObject));
        assert_eq!(IngressEvent::parse("\"text\""), Err(IngressError::NotAnObject));
    }

    #[test]
    fn missing_or_non_string_fields_are_rejected() {
        assert_eq!(
            IngressEvent::parse(r#"{"app":"Mail"}"#),
            Err(IngressError::MissingField("channel"))
        );
        assert_eq!(
            IngressEvent::parse(r#"{"channel":"inbox","app":3}"#),
            Err(IngressError::MissingField("app"))
        );
    }

    #[test]
    fn multiline_text_survives_decoding() {
        let body = "{\"channel\":\"sms\",\"app\":\"Messages\",\"text\":\"line one\nline two\"}";
        let event = IngressEvent::parse(body).expect("decodes after escaping");
        assert_eq!(event.payload["text"], "line one\nline two");
        assert!(!event.raw.contains('\n'));
    }

    #[test]
    fn pretty_printed_object_decodes_unchanged() {
        let body = "{\n  \"channel\": \"mail\",\n  \"app\": \"Gmail\"\n}";
        let event = IngressEvent::parse(body).expect("valid JSON as sent");
        assert_eq!(event.channel, "mail");
        assert_eq!(event.app, "Gmail");
        assert_eq!(event.raw, body);
        assert!(filter().check(&event).is_accepted());
    }

    #[test]
    fn pretty_printed_with_multiline_text_falls_back_to_escaping() {
        let body = "{\n  \"channel\": \"sms\",\n  \"app\": \"Messages\",\n  \"text\": \"a\nb\"\n}";
        let event = IngressEvent::parse(body).expect("decodes after escaping");
        assert_eq!(event.payload["text"], "a\nb");
        assert_eq!(event.raw, sanitize(body));
    }

    #[test]
    fn denied_channel_is_ignored() {
        let event = IngressEvent::parse(r#"{"channel":"CHR","app":"X"}"#).expect("parse");
        assert_eq!(filter().check(&event), FilterDecision::IgnoredChannel);
    }

    #[test]
    fn denied_app_is_ignored() {
        let event = IngressEvent::parse(r#"{"channel":"feed","app":"Instagram"}"#).expect("parse");
        assert_eq!(filter().check(&event), FilterDecision::IgnoredApp);
    }

    #[test]
    fn other_events_are_accepted() {
        let event = IngressEvent::parse(r#"{"channel":"mail","app":"Gmail"}"#).expect("parse");
        assert!(filter().check(&event).is_accepted());
    }

    #[test]
    fn matching_is_case_sensitive() {
        let event = IngressEvent::parse(r#"{"channel":"chr","app":"instagram"}"#).expect("parse");
        assert!(filter().check(&event).is_accepted());
    }
}
