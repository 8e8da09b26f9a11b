//! Queue provider implementations.
//!
//! This module contains concrete implementations of the `QueueClient` trait
//! for different queue backends.

pub mod aws;
pub mod memory;

pub use aws::AwsSqsProvider;
pub use memory::{InMemoryProvider, QueueStats};
