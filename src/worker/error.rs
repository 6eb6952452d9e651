//! Collection-specific error types.

use std::io;
use thiserror::Error;

use crate::config::SettingsError;

/// Result type for collection operations.
pub type CollectionResult<T> = Result<T, CollectionError>;

/// Errors that can occur while collecting documentation from the worker.
///
/// This is the single fatal error kind surfaced to callers of `collect`;
/// the variants distinguish where in the pipeline the failure happened.
#[derive(Error, Debug)]
pub enum CollectionError {
    /// Failed to spawn the worker process.
    #[error("failed to spawn worker process: {0}")]
    Spawn(#[source] io::Error),

    /// Failed to write a request to worker stdin.
    #[error("failed to write to worker: {0}")]
    Write(#[source] io::Error),

    /// Failed to read a response from worker stdout.
    #[error("failed to read from worker: {0}")]
    Read(#[source] io::Error),

    /// Failed to serialize a request to JSON.
    #[error("failed to encode request: {0}")]
    Encode(#[source] serde_json::Error),

    /// A response line was not valid JSON.
    #[error("failed to decode response line {line:?}: {source}")]
    Decode {
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
        /// The offending raw line.
        line: String,
    },

    /// The worker reported a collection failure.
    #[error("collection failed: {message}")]
    Worker {
        /// Error message from the worker.
        message: String,
        /// Worker-side traceback, when provided. Diagnostic context only.
        traceback: Option<String>,
    },

    /// The worker process exited while a response was expected.
    #[error("worker process exited unexpectedly")]
    WorkerExited,

    /// Another exchange was already in flight on this channel.
    #[error("an exchange is already in flight on this worker channel")]
    ChannelBusy,

    /// The channel was left mid-exchange by an earlier failure and its
    /// stream position can no longer be trusted.
    #[error("worker channel is unusable; restart the worker")]
    ChannelPoisoned,

    /// No response arrived within the configured timeout.
    #[error("exchange timed out after {0} seconds")]
    Timeout(u64),

    /// A non-error response held a number of objects other than one.
    #[error("expected exactly one collected object, got {0}")]
    ObjectCount(usize),

    /// A category list referenced a path absent from the same node's
    /// children mapping.
    #[error("object {parent} references unknown child {path}")]
    MissingChild {
        /// Path of the node whose category list held the reference.
        parent: String,
        /// The unresolved child path.
        path: String,
    },

    /// Settings could not be resolved while preparing the worker command.
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

impl CollectionError {
    /// Whether the worker must be restarted before the channel is used
    /// again. A worker-reported error does not poison the channel (the
    /// full response line was consumed); a timeout, EOF, or decode failure
    /// leaves the stream position suspect.
    pub fn requires_restart(&self) -> bool {
        matches!(
            self,
            Self::WorkerExited | Self::ChannelPoisoned | Self::Timeout(_) | Self::Decode { .. }
        )
    }

    /// Whether this error originated inside the worker rather than in the
    /// channel or the decoder.
    pub fn is_worker_reported(&self) -> bool {
        matches!(self, Self::Worker { .. })
    }
}
