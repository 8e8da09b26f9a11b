//! Hand-written fakes shared by the unit tests in this crate.

use crate::error::SnapshotError;
use crate::snapshot::{SnapshotMetadata, SnapshotWriter};
use async_trait::async_trait;
use sqs_peek_runtime::{
    DeleteRequestEntry, MessageId, ProviderType, QueueError, QueueLocator, QueueUrl,
    ReceiptHandle, ReceiveOptions, ReceivedMessage,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub(crate) const QUEUE_URL: &str = "https://sqs.ap-south-1.amazonaws.com/123456789012/orders";

pub(crate) fn queue_url() -> QueueUrl {
    QueueUrl::new(QUEUE_URL)
}

pub(crate) fn messages(count: usize) -> Vec<ReceivedMessage> {
    (0..count).map(|n| message(n as u64)).collect()
}

fn message(n: u64) -> ReceivedMessage {
    ReceivedMessage::new(
        format!("msg-{:05}", n).parse::<MessageId>().unwrap(),
        ReceiptHandle::new(format!("receipt-{:05}", n)),
    )
    .with_body(format!("body {}", n))
}

fn scripted_failure(operation: &str, call: u32) -> QueueError {
    QueueError::ConnectionFailed {
        message: format!("scripted {} failure on call {}", operation, call),
    }
}

// ============================================================================
// Scripted Queue Client
// ============================================================================

/// Queue client that returns batches of pre-scripted sizes
///
/// Batches are served from one shared script in call order, whichever worker
/// asks. Once the script runs out every receive returns an empty batch.
#[derive(Default)]
pub(crate) struct ScriptedQueueClient {
    script: Mutex<VecDeque<usize>>,
    receive_delay: Option<Duration>,
    fail_resolve: bool,
    fail_receive_on: Option<u32>,
    fail_delete_on: Option<u32>,
    next_message: AtomicU64,
    receive_calls: AtomicU32,
    delete_calls: AtomicU32,
    delivered: Mutex<Vec<usize>>,
    deleted: Mutex<Vec<Vec<DeleteRequestEntry>>>,
}

impl ScriptedQueueClient {
    pub(crate) fn new(batches: impl IntoIterator<Item = usize>) -> Self {
        Self {
            script: Mutex::new(batches.into_iter().collect()),
            ..Default::default()
        }
    }

    /// Queue holding `total` messages, served in full batches
    pub(crate) fn with_messages(total: usize) -> Self {
        let full = total / 10;
        let rest = total % 10;
        let mut batches = vec![10; full];
        if rest > 0 {
            batches.push(rest);
        }
        Self::new(batches)
    }

    pub(crate) fn with_receive_delay(mut self, delay: Duration) -> Self {
        self.receive_delay = Some(delay);
        self
    }

    pub(crate) fn failing_resolve(mut self) -> Self {
        self.fail_resolve = true;
        self
    }

    /// Fail the n-th receive call (1-based)
    pub(crate) fn failing_receive_on(mut self, call: u32) -> Self {
        self.fail_receive_on = Some(call);
        self
    }

    /// Fail the n-th delete call (1-based)
    pub(crate) fn failing_delete_on(mut self, call: u32) -> Self {
        self.fail_delete_on = Some(call);
        self
    }

    pub(crate) fn receive_calls(&self) -> u32 {
        self.receive_calls.load(Ordering::SeqCst)
    }

    /// Size of every batch handed out, in delivery order
    pub(crate) fn delivered_batch_sizes(&self) -> Vec<usize> {
        self.delivered.lock().unwrap().clone()
    }

    /// Entries of every successful delete call
    pub(crate) fn delete_batches(&self) -> Vec<Vec<DeleteRequestEntry>> {
        self.deleted.lock().unwrap().clone()
    }

    pub(crate) fn delete_calls(&self) -> u32 {
        self.delete_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl sqs_peek_runtime::QueueClient for ScriptedQueueClient {
    async fn resolve_queue(&self, locator: &QueueLocator) -> Result<QueueUrl, QueueError> {
        if self.fail_resolve {
            return Err(QueueError::AuthenticationFailed {
                message: format!("no credentials for {}", locator),
            });
        }
        Ok(queue_url())
    }

    async fn approximate_depth(&self, _queue: &QueueUrl) -> Result<Option<u64>, QueueError> {
        let remaining: usize = self.script.lock().unwrap().iter().sum();
        Ok(Some(remaining as u64))
    }

    async fn receive_batch(
        &self,
        _queue: &QueueUrl,
        options: &ReceiveOptions,
    ) -> Result<Vec<ReceivedMessage>, QueueError> {
        let call = self.receive_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_receive_on == Some(call) {
            return Err(scripted_failure("receive", call));
        }
        assert!(options.max_messages as usize <= sqs_peek_runtime::MAX_BATCH_SIZE);

        let size = self.script.lock().unwrap().pop_front().unwrap_or(0);

        if let Some(delay) = self.receive_delay {
            tokio::time::sleep(delay).await;
        }

        let first = self.next_message.fetch_add(size as u64, Ordering::SeqCst);
        let batch: Vec<ReceivedMessage> = (first..first + size as u64).map(message).collect();
        self.delivered.lock().unwrap().push(batch.len());
        Ok(batch)
    }

    async fn delete_batch(
        &self,
        _queue: &QueueUrl,
        entries: &[DeleteRequestEntry],
    ) -> Result<(), QueueError> {
        let call = self.delete_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_delete_on == Some(call) {
            return Err(scripted_failure("delete", call));
        }
        if entries.len() > sqs_peek_runtime::MAX_BATCH_SIZE {
            return Err(QueueError::BatchTooLarge {
                size: entries.len(),
                max_size: sqs_peek_runtime::MAX_BATCH_SIZE,
            });
        }

        self.deleted.lock().unwrap().push(entries.to_vec());
        Ok(())
    }

    fn provider_type(&self) -> ProviderType {
        ProviderType::InMemory
    }
}

// ============================================================================
// Recording Snapshot Writer
// ============================================================================

/// Snapshot writer that keeps what it was given in memory
#[derive(Default)]
pub(crate) struct RecordingSnapshotWriter {
    fail: bool,
    written: Mutex<Vec<Vec<ReceivedMessage>>>,
}

impl RecordingSnapshotWriter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    /// Every snapshot written so far
    pub(crate) fn writes(&self) -> Vec<Vec<ReceivedMessage>> {
        self.written.lock().unwrap().clone()
    }
}

#[async_trait]
impl SnapshotWriter for RecordingSnapshotWriter {
    async fn write(&self, messages: &[ReceivedMessage]) -> Result<SnapshotMetadata, SnapshotError> {
        if self.fail {
            return Err(SnapshotError::Io {
                path: "memory://snapshot".into(),
                source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
            });
        }

        self.written.lock().unwrap().push(messages.to_vec());
        Ok(SnapshotMetadata {
            location: "memory://snapshot".to_string(),
            message_count: messages.len(),
            size_bytes: 0,
        })
    }
}
