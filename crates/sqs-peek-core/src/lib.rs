//! # sqs-peek Core
//!
//! Drain engine for sqs-peek: pull every message off a queue with a pool of
//! concurrent pollers, persist them as one snapshot, and optionally delete
//! them again in batches.
//!
//! ## Architecture
//!
//! The engine depends only on trait abstractions:
//! - [`sqs_peek_runtime::QueueClient`] for the queue service
//! - [`SnapshotWriter`] for durable output
//!
//! Concrete implementations are injected by the caller, so the same
//! coordinator runs against AWS SQS, the in-memory provider or a test fake.
//!
//! ## Usage
//!
//! ```no_run
//! use sqs_peek_core::{DrainCoordinator, DrainSession, JsonFileSnapshotWriter};
//! use sqs_peek_runtime::{InMemoryProvider, QueueName};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = InMemoryProvider::new();
//! let name = QueueName::new("orders".to_string())?;
//! let queue = provider.create_queue(&name)?;
//! provider.send_messages(&queue, ["hello", "world"])?;
//!
//! let session = DrainSession::new("orders".parse()?, "queue_messages.json");
//! let coordinator = DrainCoordinator::new(
//!     Arc::new(provider),
//!     Arc::new(JsonFileSnapshotWriter::new(session.output())),
//!     session,
//! );
//! let report = coordinator.perform().await?;
//! println!("Fetched {} records", report.messages);
//! # Ok(())
//! # }
//! ```

pub mod collection;
pub mod coordinator;
pub mod error;
pub mod poller;
pub mod pool;
pub mod purge;
pub mod session;
pub mod snapshot;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use collection::MessageCollection;
pub use coordinator::{DrainCoordinator, DrainReport, DrainedSnapshot};
pub use error::{DrainError, SnapshotError};
pub use poller::{Poller, PollerReport};
pub use pool::WorkerPool;
pub use purge::{PurgeConsumerReport, PurgePipeline, PurgeReport};
pub use session::{
    detect_worker_count, DrainSession, DEFAULT_EMPTY_RECEIVE_LIMIT, DEFAULT_OUTPUT_FILE,
};
pub use snapshot::{JsonFileSnapshotWriter, SnapshotMetadata, SnapshotWriter};
