//! # pulse-llm — Resilient Inference Client for PULSE
//!
//! Wraps a remote inference API (Gemini by default) behind a client that:
//!   - picks an ordered list of models by request difficulty
//!   - retries each model with exponential backoff
//!   - falls through to the next model when one is exhausted
//!   - strips markdown code fences, decodes JSON, validates it against an
//!     [`OutputSchema`]
//!   - returns the first schema-valid response, or a single terminal failure
//!
//! Embeddings go through the same client as a single, untiered call.
//!
//! # Architecture
//!
//! ```text
//! InferenceRequest ──▶ ModelTierResolver ──▶ [model₁, model₂, …]
//!                                   │
//!            RetryState (models × MAX_TRIES, backoff per model)
//!                                   │
//!                InferenceBackend::generate_content
//!                                   │
//!        strip fence ─▶ serde_json ─▶ SchemaValidator ─▶ StructuredResult
//! ```

pub mod backend;
pub mod client;
pub mod error;
pub mod gemini;
pub mod prompt;
pub mod retry;
pub mod schema;
pub mod tier;
pub mod types;

pub use backend::{DisabledBackend, InferenceBackend};
pub use client::InferenceClient;
pub use error::LlmError;
pub use gemini::GeminiBackend;
pub use schema::{FieldKind, OutputSchema, SchemaValidator};
pub use types::{Difficulty, GenerationReport, InferenceRequest, StructuredResult};
