//! # sqs-peek Runtime
//!
//! Queue client abstraction used by the sqs-peek drain engine, with an AWS SQS
//! provider for real queues and an in-memory provider for tests and local runs.
//!
//! This library provides:
//! - Provider-agnostic receive and batch-delete operations
//! - Queue identification by URL, ARN, or name
//! - Serializable message snapshots that keep every field the service returns
//!
//! ## Module Organization
//!
//! - [error] - Error types for all queue operations
//! - [message] - Queue identifiers, received messages and receipt handles
//! - [provider] - Provider types and configuration
//! - [client] - The `QueueClient` trait consumed by the drain engine
//! - [providers] - Concrete providers

// Module declarations
pub mod client;
pub mod error;
pub mod message;
pub mod provider;
pub mod providers;

// Re-export commonly used types at crate root for convenience
pub use client::{QueueClient, MAX_BATCH_SIZE};
pub use error::{ConfigurationError, QueueError, ValidationError};
pub use message::{
    DeleteRequestEntry, MessageAttributeValue, MessageId, QueueLocator, QueueName, QueueUrl,
    ReceiptHandle, ReceiveOptions, ReceivedMessage,
};
pub use provider::{AwsSqsConfig, ProviderType};
pub use providers::{AwsSqsProvider, InMemoryProvider, QueueStats};

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
