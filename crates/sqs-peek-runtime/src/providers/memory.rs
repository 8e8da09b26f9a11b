//! In-memory queue provider implementation for testing and development.
//!
//! This module provides an in-process queue with the delivery semantics the
//! drain engine relies on:
//! - Receiving hides messages (in flight) until they are deleted
//! - Every delivery gets a fresh receipt handle
//! - In-flight messages can be made visible again to simulate redelivery
//! - Batch limits match SQS (10 per receive, 10 per delete)
//!
//! This provider is intended for:
//! - Unit and integration testing of the drain engine
//! - Local development without AWS credentials

use crate::client::{QueueClient, MAX_BATCH_SIZE};
use crate::error::{QueueError, ValidationError};
use crate::message::{
    DeleteRequestEntry, MessageId, QueueLocator, QueueName, QueueUrl, ReceiptHandle,
    ReceiveOptions, ReceivedMessage,
};
use crate::provider::ProviderType;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;

const URL_SCHEME: &str = "memory://";

// ============================================================================
// Internal Storage Structures
// ============================================================================

/// Thread-safe storage for all queues
#[derive(Default)]
struct QueueStorage {
    queues: HashMap<String, InMemoryQueue>,
}

impl QueueStorage {
    fn queue_mut(&mut self, queue: &QueueUrl) -> Result<&mut InMemoryQueue, QueueError> {
        self.queues
            .get_mut(queue.queue_name())
            .ok_or_else(|| QueueError::QueueNotFound {
                queue_name: queue.queue_name().to_string(),
            })
    }
}

/// Internal queue state for a single queue
#[derive(Default)]
struct InMemoryQueue {
    /// Visible messages (FIFO order)
    available: VecDeque<StoredMessage>,
    /// Delivered but not yet deleted, keyed by receipt handle
    in_flight: HashMap<String, StoredMessage>,
    receive_calls: u64,
    delete_calls: u64,
    deleted: u64,
}

/// A message stored in the queue with metadata
#[derive(Clone)]
struct StoredMessage {
    message_id: MessageId,
    body: String,
    sent_at_millis: u128,
    receive_count: u32,
}

impl StoredMessage {
    fn deliver(&mut self) -> ReceivedMessage {
        self.receive_count += 1;
        let receipt = format!("{}-{}", self.message_id, uuid::Uuid::new_v4());

        ReceivedMessage::new(self.message_id.clone(), ReceiptHandle::new(receipt))
            .with_body(self.body.clone())
            .with_attribute("ApproximateReceiveCount", self.receive_count.to_string())
            .with_attribute("SentTimestamp", self.sent_at_millis.to_string())
    }
}

/// Point-in-time counters for one in-memory queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueueStats {
    pub available: usize,
    pub in_flight: usize,
    pub receive_calls: u64,
    pub delete_calls: u64,
    pub deleted: u64,
}

// ============================================================================
// InMemoryProvider
// ============================================================================

/// In-memory queue provider implementation
#[derive(Clone, Default)]
pub struct InMemoryProvider {
    storage: Arc<Mutex<QueueStorage>>,
}

impl InMemoryProvider {
    /// Create new in-memory provider with no queues
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, QueueStorage>, QueueError> {
        self.storage.lock().map_err(|_| QueueError::ProviderError {
            provider: ProviderType::InMemory.to_string(),
            code: "LockPoisoned".to_string(),
            message: "queue storage lock poisoned by a panicking thread".to_string(),
        })
    }

    /// Create a queue, or return the existing one with the same name
    pub fn create_queue(&self, name: &QueueName) -> Result<QueueUrl, QueueError> {
        let mut storage = self.lock()?;
        storage.queues.entry(name.as_str().to_string()).or_default();
        Ok(QueueUrl::new(format!("{}{}", URL_SCHEME, name)))
    }

    /// Enqueue messages with the given bodies
    pub fn send_messages<I, S>(&self, queue: &QueueUrl, bodies: I) -> Result<Vec<MessageId>, QueueError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let sent_at_millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis())
            .unwrap_or_default();

        let mut storage = self.lock()?;
        let target = storage.queue_mut(queue)?;

        let mut ids = Vec::new();
        for body in bodies {
            let message_id = MessageId::new();
            target.available.push_back(StoredMessage {
                message_id: message_id.clone(),
                body: body.into(),
                sent_at_millis,
                receive_count: 0,
            });
            ids.push(message_id);
        }

        Ok(ids)
    }

    /// Make every in-flight message visible again, as if its visibility
    /// timeout had expired. Returns how many messages were released.
    pub fn release_in_flight(&self, queue: &QueueUrl) -> Result<usize, QueueError> {
        let mut storage = self.lock()?;
        let target = storage.queue_mut(queue)?;

        let released: Vec<StoredMessage> = target.in_flight.drain().map(|(_, m)| m).collect();
        let count = released.len();
        target.available.extend(released);
        Ok(count)
    }

    /// Current counters for a queue
    pub fn stats(&self, queue: &QueueUrl) -> Result<QueueStats, QueueError> {
        let mut storage = self.lock()?;
        let target = storage.queue_mut(queue)?;

        Ok(QueueStats {
            available: target.available.len(),
            in_flight: target.in_flight.len(),
            receive_calls: target.receive_calls,
            delete_calls: target.delete_calls,
            deleted: target.deleted,
        })
    }
}

impl std::fmt::Debug for InMemoryProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryProvider").finish_non_exhaustive()
    }
}

#[async_trait]
impl QueueClient for InMemoryProvider {
    async fn resolve_queue(&self, locator: &QueueLocator) -> Result<QueueUrl, QueueError> {
        let name = locator.queue_name();
        let storage = self.lock()?;

        if storage.queues.contains_key(name) {
            Ok(QueueUrl::new(format!("{}{}", URL_SCHEME, name)))
        } else {
            Err(QueueError::QueueNotFound {
                queue_name: name.to_string(),
            })
        }
    }

    async fn approximate_depth(&self, queue: &QueueUrl) -> Result<Option<u64>, QueueError> {
        let mut storage = self.lock()?;
        let target = storage.queue_mut(queue)?;
        Ok(Some(target.available.len() as u64))
    }

    async fn receive_batch(
        &self,
        queue: &QueueUrl,
        options: &ReceiveOptions,
    ) -> Result<Vec<ReceivedMessage>, QueueError> {
        let max_messages = options.max_messages as usize;
        if max_messages == 0 {
            return Err(QueueError::ValidationError(ValidationError::OutOfRange {
                field: "max_messages".to_string(),
                message: "must request at least one message".to_string(),
            }));
        }
        if max_messages > MAX_BATCH_SIZE {
            return Err(QueueError::BatchTooLarge {
                size: max_messages,
                max_size: MAX_BATCH_SIZE,
            });
        }

        let mut storage = self.lock()?;
        let target = storage.queue_mut(queue)?;
        target.receive_calls += 1;

        let mut batch = Vec::with_capacity(max_messages.min(target.available.len()));
        while batch.len() < max_messages {
            let Some(mut stored) = target.available.pop_front() else {
                break;
            };
            let delivered = stored.deliver();
            target
                .in_flight
                .insert(delivered.receipt_handle.handle().to_string(), stored);
            batch.push(delivered);
        }

        Ok(batch)
    }

    async fn delete_batch(
        &self,
        queue: &QueueUrl,
        entries: &[DeleteRequestEntry],
    ) -> Result<(), QueueError> {
        if entries.len() > MAX_BATCH_SIZE {
            return Err(QueueError::BatchTooLarge {
                size: entries.len(),
                max_size: MAX_BATCH_SIZE,
            });
        }

        let mut storage = self.lock()?;
        let target = storage.queue_mut(queue)?;
        target.delete_calls += 1;

        for entry in entries {
            match target.in_flight.remove(entry.receipt_handle.handle()) {
                Some(_) => target.deleted += 1,
                None => debug!(
                    queue = %queue,
                    message_id = %entry.id,
                    "Receipt handle is not in flight; entry ignored"
                ),
            }
        }

        Ok(())
    }

    fn provider_type(&self) -> ProviderType {
        ProviderType::InMemory
    }
}
