//! # Drain Coordinator
//!
//! Runs one drain from start to finish:
//!
//! 1. Resolve the queue (the first authenticated call)
//! 2. Run one poller per worker until every poller has stopped
//! 3. Write the snapshot
//! 4. Purge the drained messages, if requested
//!
//! Steps 1-3 are [`DrainCoordinator::drain`] and step 4 is
//! [`DrainCoordinator::finish`], so a caller can report the snapshot before
//! anything is deleted. The first error from any stage ends the run. A
//! receive failure aborts the remaining pollers and nothing is written.

use crate::collection::MessageCollection;
use crate::error::{stage, DrainError};
use crate::poller::{Poller, PollerReport};
use crate::pool::WorkerPool;
use crate::purge::{PurgePipeline, PurgeReport};
use crate::session::DrainSession;
use crate::snapshot::{SnapshotMetadata, SnapshotWriter};
use sqs_peek_runtime::{QueueClient, QueueUrl, ReceivedMessage};
use std::sync::Arc;
use tracing::{info, warn};

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;

/// Summary of a successful drain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrainReport {
    pub queue: QueueUrl,
    pub worker_count: usize,
    /// Per-poller reports, ordered by worker id
    pub pollers: Vec<PollerReport>,
    /// Messages collected, redeliveries included
    pub messages: usize,
    pub snapshot: SnapshotMetadata,
    /// Present only when the session asked for a purge
    pub purge: Option<PurgeReport>,
}

/// State after the snapshot is on disk and before any message is deleted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrainedSnapshot {
    pub queue: QueueUrl,
    /// Per-poller reports, ordered by worker id
    pub pollers: Vec<PollerReport>,
    /// Collected messages in snapshot order
    pub messages: Vec<ReceivedMessage>,
    pub snapshot: SnapshotMetadata,
}

/// Orchestrates the receive, snapshot and purge phases
pub struct DrainCoordinator {
    client: Arc<dyn QueueClient>,
    writer: Arc<dyn SnapshotWriter>,
    session: DrainSession,
}

impl DrainCoordinator {
    pub fn new(
        client: Arc<dyn QueueClient>,
        writer: Arc<dyn SnapshotWriter>,
        session: DrainSession,
    ) -> Self {
        Self {
            client,
            writer,
            session,
        }
    }

    pub fn session(&self) -> &DrainSession {
        &self.session
    }

    /// Drain the queue, persist the snapshot and optionally purge
    ///
    /// On error nothing past the failing stage has run.
    pub async fn perform(&self) -> Result<DrainReport, DrainError> {
        let drained = self.drain().await?;
        self.finish(drained).await
    }

    /// Resolve the queue, run the receive phase and write the snapshot
    ///
    /// Nothing is deleted yet; pass the result to [`DrainCoordinator::finish`].
    pub async fn drain(&self) -> Result<DrainedSnapshot, DrainError> {
        let queue = self
            .client
            .resolve_queue(&self.session.queue)
            .await
            .map_err(DrainError::Session)?;

        info!(
            queue = %queue,
            provider = %self.client.provider_type(),
            workers = self.session.worker_count.get(),
            purge = self.session.purge,
            "Queue resolved; starting drain"
        );
        self.log_depth(&queue).await;

        let collection = MessageCollection::new();
        let pollers = self.receive_phase(&queue, &collection).await?;
        let messages = collection.into_messages().await;
        info!(messages = messages.len(), "Receive phase complete");

        let snapshot = self.writer.write(&messages).await?;

        Ok(DrainedSnapshot {
            queue,
            pollers,
            messages,
            snapshot,
        })
    }

    /// Purge the drained messages if the session asks for it
    pub async fn finish(&self, drained: DrainedSnapshot) -> Result<DrainReport, DrainError> {
        let DrainedSnapshot {
            queue,
            pollers,
            messages,
            snapshot,
        } = drained;
        let message_count = messages.len();

        let purge = if self.session.purge {
            let pipeline =
                PurgePipeline::new(Arc::clone(&self.client), queue.clone(), self.session.worker_count);
            Some(pipeline.run(messages).await?)
        } else {
            None
        };

        Ok(DrainReport {
            queue,
            worker_count: self.session.worker_count.get(),
            pollers,
            messages: message_count,
            snapshot,
            purge,
        })
    }

    async fn receive_phase(
        &self,
        queue: &QueueUrl,
        collection: &MessageCollection,
    ) -> Result<Vec<PollerReport>, DrainError> {
        let mut pool = WorkerPool::new(stage::RECEIVE);
        for worker in 0..self.session.worker_count.get() {
            let poller = Poller::new(
                worker,
                Arc::clone(&self.client),
                queue.clone(),
                collection.clone(),
                &self.session,
            );
            pool.spawn(poller.run());
        }

        let mut reports = pool.join_all().await?;
        reports.sort_by_key(|report| report.worker);
        Ok(reports)
    }

    /// Depth is informational only; a failed probe does not stop the run
    async fn log_depth(&self, queue: &QueueUrl) {
        match self.client.approximate_depth(queue).await {
            Ok(Some(depth)) => info!(queue = %queue, approximate_depth = depth, "Queue depth"),
            Ok(None) => {}
            Err(e) => warn!(queue = %queue, error = %e, "Could not read queue depth"),
        }
    }
}
