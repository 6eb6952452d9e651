//! Worker communication module.
//!
//! This module owns the extraction worker process and the line protocol
//! spoken with it. The worker handles all source introspection (importing
//! modules, walking objects, reading docstrings) while this crate remains
//! language-analysis-agnostic.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Magpie (Rust + Tokio)                       │
//! │  ┌───────────────────────────────────────────────────────────┐  │
//! │  │                       WorkerClient                        │  │
//! │  │  - Spawns pytkdocs as a child process                     │  │
//! │  │  - One JSON line in, one JSON line out, per request       │  │
//! │  │  - Single exchange in flight; correlation by order        │  │
//! │  └───────────────────────────────────────────────────────────┘  │
//! │                              │                                   │
//! │                 stdin (JSON) │ stdout (JSON)                    │
//! │                              ▼                                   │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//!                                ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │            pytkdocs (long-running child process)                │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use magpie::config::Settings;
//! use magpie::worker::WorkerClient;
//! use magpie::worker::protocol::CollectRequest;
//!
//! let settings = Settings::load()?;
//! let client = WorkerClient::spawn_with_settings(&settings.worker).await?;
//!
//! let request = CollectRequest::new("pkg.Foo", settings.selection.to_options());
//! let line = client.exchange(&request).await?;
//!
//! client.terminate();
//! ```

pub mod classify;
mod client;
mod error;
pub mod protocol;

pub use classify::{classify, Classified};
pub use client::WorkerClient;
pub use error::{CollectionError, CollectionResult};
