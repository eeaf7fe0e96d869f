//! # PULSE Core Library
//!
//! Storage and recall for a personal notification archive.
//!
//! Accepted notifications are stored together with an embedding vector in a
//! [`NotificationStore`]; the [`RetrievalEngine`] later ranks them against a
//! query embedding by cosine similarity.
//!
//! - [`filter`] — decode webhook payloads and apply channel/app deny-lists
//! - [`persistence`] — append-only SQLite store with monotonic ids
//! - [`retrieval`] — thresholded, ranked similarity search
//! - [`embedding`] — vector math (cosine similarity, dimension checks)
//! - [`config`] — `pulse.toml` schema

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod embedding;
pub mod error;
pub mod filter;
pub mod persistence;
pub mod retrieval;
pub mod types;

pub use config::PulseConfig;
pub use error::PulseError;
pub use persistence::NotificationStore;
pub use retrieval::RetrievalEngine;
pub use types::*;
