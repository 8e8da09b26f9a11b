//! Receive-phase worker.
//!
//! A poller keeps receiving batches and appending them to the shared
//! collection until its own running total has failed to grow for a number of
//! consecutive calls. That is a local decision: one poller can see an empty
//! batch by chance and stop while its peers are still finding messages. A
//! single pass is therefore not guaranteed to drain the queue completely.

use crate::collection::MessageCollection;
use crate::error::DrainError;
use crate::session::DrainSession;
use sqs_peek_runtime::{QueueClient, QueueUrl, ReceiveOptions};
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::{debug, info};

#[cfg(test)]
#[path = "poller_tests.rs"]
mod tests;

/// Outcome of one poller's loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollerReport {
    pub worker: usize,
    pub receive_calls: u64,
    pub messages_received: usize,
}

/// One receive-phase worker
pub struct Poller {
    worker: usize,
    client: Arc<dyn QueueClient>,
    queue: QueueUrl,
    collection: MessageCollection,
    options: ReceiveOptions,
    empty_receive_limit: NonZeroU32,
}

impl Poller {
    /// Create a poller using the session's receive options and stop rule
    ///
    /// The per-call message count is clamped to the provider's batch cap.
    pub fn new(
        worker: usize,
        client: Arc<dyn QueueClient>,
        queue: QueueUrl,
        collection: MessageCollection,
        session: &DrainSession,
    ) -> Self {
        let batch_cap =
            u32::try_from(client.provider_type().max_batch_size()).unwrap_or(u32::MAX);
        let mut options = session.receive_options.clone();
        options.max_messages = options.max_messages.clamp(1, batch_cap.max(1));

        Self {
            worker,
            client,
            queue,
            collection,
            options,
            empty_receive_limit: session.empty_receive_limit,
        }
    }

    /// Receive until the stop rule fires or a receive call fails
    pub async fn run(self) -> Result<PollerReport, DrainError> {
        let mut receive_calls = 0u64;
        let mut messages_received = 0usize;
        let mut calls_without_progress = 0u32;

        while calls_without_progress < self.empty_receive_limit.get() {
            let batch = self
                .client
                .receive_batch(&self.queue, &self.options)
                .await
                .map_err(|source| DrainError::Receive {
                    worker: self.worker,
                    source,
                })?;
            receive_calls += 1;

            let batch_size = batch.len();
            if batch_size == 0 {
                calls_without_progress += 1;
                debug!(
                    worker = self.worker,
                    empty_receives = calls_without_progress,
                    "Empty receive"
                );
                continue;
            }

            calls_without_progress = 0;
            messages_received += batch_size;
            let total = self.collection.append(batch).await;
            debug!(
                worker = self.worker,
                batch_size,
                received = messages_received,
                total,
                "Batch appended"
            );
        }

        info!(
            worker = self.worker,
            receive_calls,
            messages_received,
            "Poller finished"
        );

        Ok(PollerReport {
            worker: self.worker,
            receive_calls,
            messages_received,
        })
    }
}
