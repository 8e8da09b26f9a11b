//! Error types for the drain engine.
//!
//! Every error is fatal for the run. Each variant identifies the stage that
//! failed so the operator can tell a credential problem from a full disk.

use sqs_peek_runtime::QueueError;
use std::path::PathBuf;
use thiserror::Error;

/// Stage of a drain run, used in diagnostics
pub mod stage {
    pub const SESSION: &str = "session";
    pub const RECEIVE: &str = "receive";
    pub const SNAPSHOT: &str = "snapshot";
    pub const DELETE: &str = "delete";
}

/// Fatal errors raised while draining a queue
#[derive(Debug, Error)]
pub enum DrainError {
    #[error("Failed to establish queue session: {0}")]
    Session(#[source] QueueError),

    #[error("Receive failed in poller {worker}: {source}")]
    Receive {
        worker: usize,
        #[source]
        source: QueueError,
    },

    #[error("Delete failed in purge consumer {worker}: {source}")]
    Delete {
        worker: usize,
        #[source]
        source: QueueError,
    },

    #[error("Snapshot failed: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("A {stage} worker did not complete: {message}")]
    WorkerAborted {
        stage: &'static str,
        message: String,
    },
}

impl DrainError {
    /// Name of the stage that failed
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Session(_) => stage::SESSION,
            Self::Receive { .. } => stage::RECEIVE,
            Self::Delete { .. } => stage::DELETE,
            Self::Snapshot(_) => stage::SNAPSHOT,
            Self::WorkerAborted { stage, .. } => *stage,
        }
    }

    /// The queue error behind this failure, if there is one
    pub fn queue_error(&self) -> Option<&QueueError> {
        match self {
            Self::Session(source)
            | Self::Receive { source, .. }
            | Self::Delete { source, .. } => Some(source),
            Self::Snapshot(_) | Self::WorkerAborted { .. } => None,
        }
    }

    /// Whether the queue failure behind this error looks transient
    ///
    /// `None` when the failure did not come from the queue service.
    pub fn is_transient(&self) -> Option<bool> {
        self.queue_error().map(QueueError::is_transient)
    }
}

/// Errors raised while persisting a snapshot
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Failed to serialize messages: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
