//! Run state for one drain invocation.

use sqs_peek_runtime::{QueueLocator, ReceiveOptions};
use std::num::{NonZeroU32, NonZeroUsize};
use std::path::{Path, PathBuf};

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;

/// Snapshot file written when no output path is configured
pub const DEFAULT_OUTPUT_FILE: &str = "queue_messages.json";

/// Consecutive receives without progress after which a poller stops
pub const DEFAULT_EMPTY_RECEIVE_LIMIT: NonZeroU32 = match NonZeroU32::new(2) {
    Some(limit) => limit,
    None => NonZeroU32::MIN,
};

/// Number of workers to run: the host's logical parallelism, or 1 when the
/// host cannot report it
pub fn detect_worker_count() -> NonZeroUsize {
    std::thread::available_parallelism().unwrap_or(NonZeroUsize::MIN)
}

/// Everything a drain run needs to know, fixed before the run starts
#[derive(Debug, Clone)]
pub struct DrainSession {
    /// Queue as the operator identified it
    pub queue: QueueLocator,
    /// Where the snapshot is written
    pub output: PathBuf,
    /// Pollers in the receive phase and consumers in the purge phase
    pub worker_count: NonZeroUsize,
    /// Delete every drained message after the snapshot is written
    pub purge: bool,
    pub receive_options: ReceiveOptions,
    pub empty_receive_limit: NonZeroU32,
}

impl DrainSession {
    /// Create a session with detected parallelism and default receive options
    pub fn new(queue: QueueLocator, output: impl Into<PathBuf>) -> Self {
        Self {
            queue,
            output: output.into(),
            worker_count: detect_worker_count(),
            purge: false,
            receive_options: ReceiveOptions::default(),
            empty_receive_limit: DEFAULT_EMPTY_RECEIVE_LIMIT,
        }
    }

    pub fn with_worker_count(mut self, worker_count: NonZeroUsize) -> Self {
        self.worker_count = worker_count;
        self
    }

    pub fn with_purge(mut self, purge: bool) -> Self {
        self.purge = purge;
        self
    }

    pub fn with_receive_options(mut self, options: ReceiveOptions) -> Self {
        self.receive_options = options;
        self
    }

    pub fn with_empty_receive_limit(mut self, limit: NonZeroU32) -> Self {
        self.empty_receive_limit = limit;
        self
    }

    pub fn output(&self) -> &Path {
        &self.output
    }
}
