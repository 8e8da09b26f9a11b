//! Client trait for queue operations.

use crate::error::QueueError;
use crate::message::{DeleteRequestEntry, QueueLocator, QueueUrl, ReceiveOptions, ReceivedMessage};
use crate::provider::ProviderType;
use async_trait::async_trait;

/// Hard protocol cap on messages per receive call and entries per delete call
pub const MAX_BATCH_SIZE: usize = 10;

/// Interface implemented by every queue provider
///
/// Handles are shared read-only between workers, so implementations must be
/// safe for concurrent independent calls.
#[async_trait]
pub trait QueueClient: Send + Sync {
    /// Resolve what the operator typed into an addressable queue
    ///
    /// This is the first authenticated call of a run, so credential and
    /// permission problems surface here.
    async fn resolve_queue(&self, locator: &QueueLocator) -> Result<QueueUrl, QueueError>;

    /// Approximate number of visible messages, if the provider can tell
    async fn approximate_depth(&self, queue: &QueueUrl) -> Result<Option<u64>, QueueError>;

    /// Receive up to `options.max_messages` messages
    ///
    /// An empty result only means nothing was available at that instant.
    async fn receive_batch(
        &self,
        queue: &QueueUrl,
        options: &ReceiveOptions,
    ) -> Result<Vec<ReceivedMessage>, QueueError>;

    /// Delete up to [`MAX_BATCH_SIZE`] deliveries in one call
    async fn delete_batch(
        &self,
        queue: &QueueUrl,
        entries: &[DeleteRequestEntry],
    ) -> Result<(), QueueError>;

    /// Get provider type
    fn provider_type(&self) -> ProviderType;
}
