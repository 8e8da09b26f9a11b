//! Message types for queue operations including core domain identifiers.

use crate::client::MAX_BATCH_SIZE;
use crate::error::ValidationError;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;

// ============================================================================
// Core Domain Identifiers
// ============================================================================

/// Validated SQS queue name
///
/// 1-80 characters of ASCII alphanumerics, hyphens and underscores. FIFO
/// queues carry a `.fifo` suffix which counts towards the length limit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueueName(String);

impl QueueName {
    /// Create new queue name with validation
    pub fn new(name: String) -> Result<Self, ValidationError> {
        if name.is_empty() || name.len() > 80 {
            return Err(ValidationError::OutOfRange {
                field: "queue_name".to_string(),
                message: "must be 1-80 characters".to_string(),
            });
        }

        let base = name.strip_suffix(".fifo").unwrap_or(&name);
        if base.is_empty()
            || !base
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ValidationError::InvalidFormat {
                field: "queue_name".to_string(),
                message: "only ASCII alphanumeric, hyphens, and underscores allowed".to_string(),
            });
        }

        Ok(Self(name))
    }

    /// Get queue name as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for QueueName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for QueueName {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

/// Resolved, provider-addressable queue identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueueUrl(String);

impl QueueUrl {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path segment of the URL, which SQS uses as the queue name
    pub fn queue_name(&self) -> &str {
        self.0
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or(&self.0)
    }
}

impl std::fmt::Display for QueueUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How the operator identified the queue to drain
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueLocator {
    /// Full queue URL, used as is
    Url(QueueUrl),
    /// `arn:<partition>:sqs:<region>:<account>:<name>`
    Arn {
        partition: String,
        region: String,
        account_id: String,
        name: QueueName,
    },
    /// Bare queue name, resolved in the client's region and account
    Name(QueueName),
}

impl QueueLocator {
    /// Queue name regardless of how the queue was identified
    pub fn queue_name(&self) -> &str {
        match self {
            Self::Url(url) => url.queue_name(),
            Self::Arn { name, .. } => name.as_str(),
            Self::Name(name) => name.as_str(),
        }
    }

    fn parse_arn(rest: &str) -> Result<Self, ValidationError> {
        let invalid = |message: &str| ValidationError::InvalidFormat {
            field: "queue".to_string(),
            message: message.to_string(),
        };

        let parts: Vec<&str> = rest.splitn(5, ':').collect();
        let [partition, service, region, account_id, name] = parts[..] else {
            return Err(invalid(
                "ARN must look like arn:<partition>:sqs:<region>:<account>:<name>",
            ));
        };

        if service != "sqs" {
            return Err(invalid("ARN does not reference the sqs service"));
        }
        if partition.is_empty() || region.is_empty() {
            return Err(invalid("ARN partition and region must not be empty"));
        }
        if account_id.len() != 12 || !account_id.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("ARN account id must be 12 digits"));
        }

        Ok(Self::Arn {
            partition: partition.to_string(),
            region: region.to_string(),
            account_id: account_id.to_string(),
            name: QueueName::new(name.to_string())?,
        })
    }
}

impl std::fmt::Display for QueueLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Url(url) => write!(f, "{}", url),
            Self::Arn {
                partition,
                region,
                account_id,
                name,
            } => write!(f, "arn:{}:sqs:{}:{}:{}", partition, region, account_id, name),
            Self::Name(name) => write!(f, "{}", name),
        }
    }
}

impl FromStr for QueueLocator {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ValidationError::Required {
                field: "queue".to_string(),
            });
        }

        if s.starts_with("https://") || s.starts_with("http://") {
            let parsed = url::Url::parse(s).map_err(|e| ValidationError::InvalidFormat {
                field: "queue".to_string(),
                message: format!("invalid queue URL: {}", e),
            })?;

            let has_name = parsed
                .path_segments()
                .and_then(|mut segments| segments.rfind(|segment| !segment.is_empty()))
                .is_some();
            if !has_name {
                return Err(ValidationError::InvalidFormat {
                    field: "queue".to_string(),
                    message: "queue URL has no queue name in its path".to_string(),
                });
            }

            return Ok(Self::Url(QueueUrl::new(s)));
        }

        if let Some(rest) = s.strip_prefix("arn:") {
            return Self::parse_arn(rest);
        }

        Ok(Self::Name(QueueName::new(s.to_string())?))
    }
}

/// Service-assigned message identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageId(String);

impl MessageId {
    /// Generate new random message ID
    pub fn new() -> Self {
        let id = uuid::Uuid::new_v4();
        Self(id.to_string())
    }

    /// Get message ID as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MessageId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ValidationError::Required {
                field: "message_id".to_string(),
            });
        }

        Ok(Self(s.to_string()))
    }
}

/// Opaque token bound to one delivery of a message; required to delete it
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReceiptHandle(String);

impl ReceiptHandle {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    /// Get handle string
    pub fn handle(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// Message Types
// ============================================================================

/// Typed user attribute attached to a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MessageAttributeValue {
    pub data_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub string_value: Option<String>,
    #[serde(default, with = "optional_bytes_serde", skip_serializing_if = "Option::is_none")]
    pub binary_value: Option<Bytes>,
}

/// Base64 serialization for optional binary attribute values
mod optional_bytes_serde {
    use base64::{engine::general_purpose, Engine as _};
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &Option<Bytes>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match bytes {
            Some(bytes) => serializer.serialize_some(&general_purpose::STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Bytes>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let Some(encoded) = Option::<String>::deserialize(deserializer)? else {
            return Ok(None);
        };
        let decoded = general_purpose::STANDARD
            .decode(encoded)
            .map_err(serde::de::Error::custom)?;
        Ok(Some(Bytes::from(decoded)))
    }
}

/// A message received from the queue, exactly as the service delivered it
///
/// Field names serialize in the service's own PascalCase form so snapshots
/// can be compared with what the AWS console and CLI print.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReceivedMessage {
    pub message_id: MessageId,
    pub receipt_handle: ReceiptHandle,
    #[serde(rename = "MD5OfBody", default, skip_serializing_if = "Option::is_none")]
    pub md5_of_body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// System attributes such as `SentTimestamp` and `ApproximateReceiveCount`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    #[serde(
        rename = "MD5OfMessageAttributes",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub md5_of_message_attributes: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub message_attributes: BTreeMap<String, MessageAttributeValue>,
}

impl ReceivedMessage {
    /// Create a message with only the fields every delivery carries
    pub fn new(message_id: MessageId, receipt_handle: ReceiptHandle) -> Self {
        Self {
            message_id,
            receipt_handle,
            md5_of_body: None,
            body: None,
            attributes: BTreeMap::new(),
            md5_of_message_attributes: None,
            message_attributes: BTreeMap::new(),
        }
    }

    /// Set the message body
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Add a system attribute
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Add a user message attribute
    pub fn with_message_attribute(
        mut self,
        key: impl Into<String>,
        value: MessageAttributeValue,
    ) -> Self {
        self.message_attributes.insert(key.into(), value);
        self
    }
}

/// One entry of a batch delete request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteRequestEntry {
    pub id: MessageId,
    pub receipt_handle: ReceiptHandle,
}

impl From<ReceivedMessage> for DeleteRequestEntry {
    fn from(message: ReceivedMessage) -> Self {
        Self {
            id: message.message_id,
            receipt_handle: message.receipt_handle,
        }
    }
}

impl From<&ReceivedMessage> for DeleteRequestEntry {
    fn from(message: &ReceivedMessage) -> Self {
        Self {
            id: message.message_id.clone(),
            receipt_handle: message.receipt_handle.clone(),
        }
    }
}

// ============================================================================
// Receive Options
// ============================================================================

/// Configuration options for receive calls
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiveOptions {
    /// Maximum number of messages to receive in a batch
    pub max_messages: u32,
    /// Long-poll wait; zero means a short poll that returns immediately
    pub wait_time: Duration,
    /// How long received messages stay hidden from other consumers
    pub visibility_timeout: Option<Duration>,
}

impl Default for ReceiveOptions {
    fn default() -> Self {
        Self {
            max_messages: MAX_BATCH_SIZE as u32,
            wait_time: Duration::ZERO,
            visibility_timeout: None,
        }
    }
}

impl ReceiveOptions {
    /// Create new receive options with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set maximum number of messages to receive
    pub fn with_max_messages(mut self, max: u32) -> Self {
        self.max_messages = max;
        self
    }

    /// Set long-poll wait time
    pub fn with_wait_time(mut self, wait_time: Duration) -> Self {
        self.wait_time = wait_time;
        self
    }

    /// Set visibility timeout for received messages
    pub fn with_visibility_timeout(mut self, timeout: Duration) -> Self {
        self.visibility_timeout = Some(timeout);
        self
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
