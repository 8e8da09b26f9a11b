//! # Purge Pipeline
//!
//! Deletes every drained message from the queue after the snapshot has been
//! written. One producer streams messages into a single-slot channel; a pool
//! of consumers takes them off the channel, converts each into a delete entry
//! and, once the channel is closed, sends their own entries in batches of at
//! most ten.
//!
//! Consumer lifecycle: drain the channel, chunk the collected entries, send
//! chunk after chunk, done. A failed delete call is fatal; there is no retry.

use crate::error::{stage, DrainError};
use crate::pool::WorkerPool;
use async_channel::{Receiver, Sender};
use sqs_peek_runtime::{DeleteRequestEntry, QueueClient, QueueUrl, ReceivedMessage};
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::{debug, info};

#[cfg(test)]
#[path = "purge_tests.rs"]
mod tests;

/// What one consumer deleted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurgeConsumerReport {
    pub worker: usize,
    pub entries: usize,
    pub delete_calls: u64,
}

/// Outcome of a completed purge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurgeReport {
    /// Entries sent in successful delete calls, across all consumers
    pub entries_deleted: usize,
    pub delete_calls: u64,
    /// Per-consumer breakdown, ordered by worker id
    pub consumers: Vec<PurgeConsumerReport>,
}

impl PurgeReport {
    fn from_consumers(mut consumers: Vec<PurgeConsumerReport>) -> Self {
        consumers.sort_by_key(|report| report.worker);
        Self {
            entries_deleted: consumers.iter().map(|report| report.entries).sum(),
            delete_calls: consumers.iter().map(|report| report.delete_calls).sum(),
            consumers,
        }
    }
}

/// Single-producer, multi-consumer batch deleter
pub struct PurgePipeline {
    client: Arc<dyn QueueClient>,
    queue: QueueUrl,
    consumers: NonZeroUsize,
}

impl PurgePipeline {
    pub fn new(client: Arc<dyn QueueClient>, queue: QueueUrl, consumers: NonZeroUsize) -> Self {
        Self {
            client,
            queue,
            consumers,
        }
    }

    /// Delete every message in `messages`
    ///
    /// Returns once every consumer has sent all of its batches, or with the
    /// first delete failure after aborting the other consumers.
    pub async fn run(&self, messages: Vec<ReceivedMessage>) -> Result<PurgeReport, DrainError> {
        info!(
            queue = %self.queue,
            messages = messages.len(),
            consumers = self.consumers.get(),
            "Purging drained messages"
        );

        let (tx, rx) = async_channel::bounded::<ReceivedMessage>(1);

        let mut pool = WorkerPool::new(stage::DELETE);
        for worker in 0..self.consumers.get() {
            let consumer = PurgeConsumer {
                worker,
                rx: rx.clone(),
                client: Arc::clone(&self.client),
                queue: self.queue.clone(),
            };
            pool.spawn(consumer.run());
        }
        drop(rx);

        let producer = tokio::spawn(produce(tx, messages));

        let consumers = match pool.join_all().await {
            Ok(consumers) => consumers,
            Err(error) => {
                producer.abort();
                return Err(error);
            }
        };

        let produced = producer.await.map_err(|join_error| DrainError::WorkerAborted {
            stage: stage::DELETE,
            message: format!("producer: {}", join_error),
        })?;

        let report = PurgeReport::from_consumers(consumers);
        info!(
            produced,
            entries_deleted = report.entries_deleted,
            delete_calls = report.delete_calls,
            "Purge complete"
        );
        Ok(report)
    }
}

/// Feed every message into the channel in collection order, then close it
async fn produce(tx: Sender<ReceivedMessage>, messages: Vec<ReceivedMessage>) -> usize {
    let mut produced = 0;
    for message in messages {
        if tx.send(message).await.is_err() {
            // Every consumer is gone; the pool reports why
            break;
        }
        produced += 1;
    }
    tx.close();
    debug!(produced, "Producer finished; channel closed");
    produced
}

struct PurgeConsumer {
    worker: usize,
    rx: Receiver<ReceivedMessage>,
    client: Arc<dyn QueueClient>,
    queue: QueueUrl,
}

impl PurgeConsumer {
    async fn run(self) -> Result<PurgeConsumerReport, DrainError> {
        let mut pending: Vec<DeleteRequestEntry> = Vec::new();
        while let Ok(message) = self.rx.recv().await {
            pending.push(DeleteRequestEntry::from(message));
        }
        debug!(worker = self.worker, entries = pending.len(), "Channel drained");

        let batch_cap = self.client.provider_type().max_batch_size().max(1);
        let mut delete_calls = 0u64;
        for chunk in pending.chunks(batch_cap) {
            self.client
                .delete_batch(&self.queue, chunk)
                .await
                .map_err(|source| DrainError::Delete {
                    worker: self.worker,
                    source,
                })?;
            delete_calls += 1;
            debug!(worker = self.worker, batch_size = chunk.len(), "Delete batch sent");
        }

        info!(
            worker = self.worker,
            entries = pending.len(),
            delete_calls,
            "Purge consumer finished"
        );

        Ok(PurgeConsumerReport {
            worker: self.worker,
            entries: pending.len(),
            delete_calls,
        })
    }
}
