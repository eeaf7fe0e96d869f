//! # pulse-server — Notification Ingest Service
//!
//! HTTP front end and CLI for PULSE. Phone notifications arrive as JSON on
//! `POST /send`, pass the ingress deny-lists, get embedded by the inference
//! client, and land in the SQLite store. Stored notifications can be searched
//! by meaning and summarised by a model.
//!
//! ## Architecture
//!
//! ```text
//!   POST /send ──▶ IngressEvent::parse ──▶ IngressFilter
//!                                             │ accept
//!                                             ▼
//!                           InferenceClient::embed ──▶ NotificationStore::save
//!
//!   GET /search ──▶ embed(query) ──▶ list() ──▶ RetrievalEngine::retrieve
//! ```
//!
//! ## Modules
//!
//! - `api` — axum router and handlers
//! - `pipeline` — embed/persist/retrieve steps shared by API and CLI
//! - `push` — outbound push delivery
//! - `logging` — subscriber setup
//! - `state` — shared handler state

pub mod api;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod push;
pub mod state;

pub use api::router;
pub use error::ApiError;
pub use push::PushNotifier;
pub use state::AppState;
