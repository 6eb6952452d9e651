//! # Magpie
//!
//! Documentation collection core for Python API reference generation.
//!
//! Magpie keeps one long-lived [`pytkdocs`](https://github.com/pawamoy/pytkdocs)
//! extraction process alive for the whole documentation run and exchanges one
//! JSON line per collected object with it. The worker flattens each object
//! tree before writing it out; this crate folds it back into a nested,
//! category-partitioned tree ready for rendering.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                Site generator (external)                 │
//! └─────────────────────────────────────────────────────────┘
//!                          │ collect("pkg.Foo", options)
//!                          ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │               WorkerCollector (this crate)               │
//! │                                                          │
//! │   exchange ──► classify ──► rebuild ──► DocNode          │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!           stdin (1 line) │ stdout (1 line)
//!                          ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │          pytkdocs (long-running child process)           │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! The exchange is strictly one request in flight at a time: the worker
//! matches request N with response N by arrival order alone, so the channel
//! rejects concurrent use instead of interleaving it.

pub mod collector;
pub mod config;
pub mod handler;
pub mod tree;
pub mod worker;

pub use collector::{Collector, WorkerCollector};
pub use config::Settings;
pub use handler::{Handler, HandlerRegistry, Renderer};
pub use tree::{rebuild, DocNode};
pub use worker::protocol::Category;
pub use worker::{CollectionError, CollectionResult, WorkerClient};
