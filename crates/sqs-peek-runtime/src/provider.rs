//! Provider types and configuration.

use crate::client::MAX_BATCH_SIZE;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Region used when neither the command line nor the configuration names one.
pub const DEFAULT_REGION: &str = "ap-south-1";

/// Enumeration of supported queue providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderType {
    AwsSqs,
    InMemory,
}

impl ProviderType {
    /// Maximum number of entries in a single receive or delete batch
    pub fn max_batch_size(&self) -> usize {
        match self {
            Self::AwsSqs => MAX_BATCH_SIZE,
            Self::InMemory => MAX_BATCH_SIZE,
        }
    }

    /// Longest long-poll wait a single receive call may request
    pub fn max_wait_time(&self) -> Duration {
        match self {
            Self::AwsSqs => Duration::from_secs(20),
            Self::InMemory => Duration::from_secs(20),
        }
    }
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AwsSqs => write!(f, "AwsSqs"),
            Self::InMemory => write!(f, "InMemory"),
        }
    }
}

/// AWS SQS configuration
///
/// Credentials are never carried here; they come from the SDK's default
/// provider chain, optionally narrowed to a named shared-config profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwsSqsConfig {
    pub region: String,
    pub profile: Option<String>,
    /// Override for LocalStack, ElasticMQ and similar SQS-compatible endpoints
    pub endpoint_url: Option<String>,
}

impl Default for AwsSqsConfig {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            profile: None,
            endpoint_url: None,
        }
    }
}

#[cfg(test)]
#[path = "provider_tests.rs"]
mod tests;
