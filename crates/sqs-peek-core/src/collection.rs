//! Shared, append-only collection of drained messages.

use sqs_peek_runtime::ReceivedMessage;
use std::sync::Arc;
use tokio::sync::Mutex;

#[cfg(test)]
#[path = "collection_tests.rs"]
mod tests;

/// Ordered sequence of received messages shared by every poller
///
/// Cloning yields another handle to the same collection. Each batch is
/// appended under the lock as a unit, so batches never interleave and no
/// append is lost. Redelivered messages are kept as separate entries.
#[derive(Debug, Clone, Default)]
pub struct MessageCollection {
    messages: Arc<Mutex<Vec<ReceivedMessage>>>,
}

impl MessageCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a batch, returning the collection length afterwards
    pub async fn append(&self, batch: Vec<ReceivedMessage>) -> usize {
        let mut messages = self.messages.lock().await;
        messages.extend(batch);
        messages.len()
    }

    pub async fn len(&self) -> usize {
        self.messages.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.messages.lock().await.is_empty()
    }

    /// Take the messages out of the collection
    ///
    /// Clones only if another handle is still alive.
    pub async fn into_messages(self) -> Vec<ReceivedMessage> {
        match Arc::try_unwrap(self.messages) {
            Ok(messages) => messages.into_inner(),
            Err(shared) => shared.lock().await.clone(),
        }
    }
}
