//! Common test utilities for sqs-peek integration tests
//!
//! This module provides:
//! - Seeded in-memory queues
//! - A fault-injecting wrapper around any queue client
//! - Snapshot file helpers

use async_trait::async_trait;
use sqs_peek_core::{DrainCoordinator, DrainSession, JsonFileSnapshotWriter};
use sqs_peek_runtime::{
    DeleteRequestEntry, InMemoryProvider, MessageId, ProviderType, QueueClient, QueueError,
    QueueLocator, QueueName, QueueUrl, ReceiveOptions, ReceivedMessage,
};
use std::collections::BTreeSet;
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Fixtures
// ============================================================================

/// In-memory provider with one queue holding `count` messages
#[allow(dead_code)]
pub fn seeded_queue(name: &str, count: usize) -> (InMemoryProvider, QueueUrl, Vec<MessageId>) {
    let provider = InMemoryProvider::new();
    let queue = provider
        .create_queue(&QueueName::new(name.to_string()).unwrap())
        .unwrap();
    let ids = provider
        .send_messages(&queue, (0..count).map(|n| format!("{{\"order\":{}}}", n)))
        .unwrap();
    (provider, queue, ids)
}

#[allow(dead_code)]
pub fn session(queue: &str, output: &Path, workers: usize) -> DrainSession {
    let locator: QueueLocator = queue.parse().unwrap();
    DrainSession::new(locator, output).with_worker_count(NonZeroUsize::new(workers).unwrap())
}

#[allow(dead_code)]
pub fn coordinator(client: Arc<dyn QueueClient>, session: DrainSession) -> DrainCoordinator {
    let writer = Arc::new(JsonFileSnapshotWriter::new(session.output()));
    DrainCoordinator::new(client, writer, session)
}

/// Messages stored in a snapshot file
#[allow(dead_code)]
pub fn read_snapshot(path: &Path) -> Vec<ReceivedMessage> {
    let contents = std::fs::read_to_string(path).unwrap();
    serde_json::from_str(&contents).unwrap()
}

#[allow(dead_code)]
pub fn unique_ids<'a>(messages: impl IntoIterator<Item = &'a ReceivedMessage>) -> BTreeSet<String> {
    messages
        .into_iter()
        .map(|message| message.message_id.to_string())
        .collect()
}

#[allow(dead_code)]
pub fn id_set(ids: &[MessageId]) -> BTreeSet<String> {
    ids.iter().map(|id| id.to_string()).collect()
}

// ============================================================================
// Fault-Injecting Client
// ============================================================================

/// Wraps a client, optionally slowing receives and failing one call
#[allow(dead_code)]
pub struct FaultyClient<C> {
    inner: C,
    receive_delay: Option<Duration>,
    fail_receive_on: Option<u32>,
    fail_delete_on: Option<u32>,
    receive_calls: AtomicU32,
    delete_calls: AtomicU32,
}

#[allow(dead_code)]
impl<C: QueueClient> FaultyClient<C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            receive_delay: None,
            fail_receive_on: None,
            fail_delete_on: None,
            receive_calls: AtomicU32::new(0),
            delete_calls: AtomicU32::new(0),
        }
    }

    pub fn with_receive_delay(mut self, delay: Duration) -> Self {
        self.receive_delay = Some(delay);
        self
    }

    /// Fail the n-th receive call (1-based)
    pub fn failing_receive_on(mut self, call: u32) -> Self {
        self.fail_receive_on = Some(call);
        self
    }

    /// Fail the n-th delete call (1-based)
    pub fn failing_delete_on(mut self, call: u32) -> Self {
        self.fail_delete_on = Some(call);
        self
    }

    pub fn receive_calls(&self) -> u32 {
        self.receive_calls.load(Ordering::SeqCst)
    }
}

fn injected(operation: &str, call: u32) -> QueueError {
    QueueError::ProviderError {
        provider: "Faulty".to_string(),
        code: "InjectedFailure".to_string(),
        message: format!("{} call {} failed", operation, call),
    }
}

#[async_trait]
impl<C: QueueClient> QueueClient for FaultyClient<C> {
    async fn resolve_queue(&self, locator: &QueueLocator) -> Result<QueueUrl, QueueError> {
        self.inner.resolve_queue(locator).await
    }

    async fn approximate_depth(&self, queue: &QueueUrl) -> Result<Option<u64>, QueueError> {
        self.inner.approximate_depth(queue).await
    }

    async fn receive_batch(
        &self,
        queue: &QueueUrl,
        options: &ReceiveOptions,
    ) -> Result<Vec<ReceivedMessage>, QueueError> {
        let call = self.receive_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_receive_on == Some(call) {
            return Err(injected("receive", call));
        }
        if let Some(delay) = self.receive_delay {
            tokio::time::sleep(delay).await;
        }
        self.inner.receive_batch(queue, options).await
    }

    async fn delete_batch(
        &self,
        queue: &QueueUrl,
        entries: &[DeleteRequestEntry],
    ) -> Result<(), QueueError> {
        let call = self.delete_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_delete_on == Some(call) {
            return Err(injected("delete", call));
        }
        self.inner.delete_batch(queue, entries).await
    }

    fn provider_type(&self) -> ProviderType {
        self.inner.provider_type()
    }
}
