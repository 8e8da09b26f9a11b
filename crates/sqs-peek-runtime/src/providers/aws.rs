//! AWS SQS provider implementation using the AWS SDK.
//!
//! ## Authentication
//!
//! Credentials come from the SDK's default provider chain (environment,
//! shared config and credentials files, SSO, container and instance metadata).
//! A named profile narrows the chain to one shared-config profile.
//!
//! ## Queue Resolution
//!
//! - **URL**: used as is; a `GetQueueAttributes` probe verifies access
//! - **Name**: resolved with `GetQueueUrl` in the configured region
//! - **ARN**: resolved with `GetQueueUrl` using the ARN's owner account; the
//!   ARN region must match the configured region
//!
//! ## Batch Limits
//!
//! SQS accepts at most 10 messages per `ReceiveMessage` and 10 entries per
//! `DeleteMessageBatch`. Both are enforced locally before any request is sent.

use crate::client::{QueueClient, MAX_BATCH_SIZE};
use crate::error::{ConfigurationError, QueueError, ValidationError};
use crate::message::{
    DeleteRequestEntry, MessageAttributeValue, MessageId, QueueLocator, QueueUrl, ReceiptHandle,
    ReceiveOptions, ReceivedMessage,
};
use crate::provider::{AwsSqsConfig, ProviderType};
use async_trait::async_trait;
use aws_sdk_sqs::config::Region;
use aws_sdk_sqs::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_sqs::types::{
    DeleteMessageBatchRequestEntry, MessageSystemAttributeName, QueueAttributeName,
};
use aws_sdk_sqs::Client;
use bytes::Bytes;
use std::fmt;
use tracing::{debug, warn};

#[cfg(test)]
#[path = "aws_tests.rs"]
mod tests;

/// SQS caps visibility timeouts at 12 hours
const MAX_VISIBILITY_TIMEOUT_SECS: u64 = 43_200;

// ============================================================================
// Error Types
// ============================================================================

/// AWS SQS specific errors
#[derive(Debug, thiserror::Error)]
pub enum AwsError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Access denied for {operation}: {message}")]
    AccessDenied { operation: String, message: String },

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("SQS service error {code}: {message}")]
    ServiceError { code: String, message: String },

    #[error("Queue not found: {0}")]
    QueueNotFound(String),

    #[error("Invalid configuration: {0}")]
    ConfigurationError(String),
}

impl AwsError {
    /// Classify an SDK failure by its service error code
    fn from_sdk<E, R>(operation: &str, queue: &str, err: SdkError<E, R>) -> Self
    where
        E: ProvideErrorMetadata + std::error::Error + 'static,
        R: fmt::Debug,
    {
        let detail = DisplayErrorContext(&err).to_string();

        if matches!(
            err,
            SdkError::DispatchFailure(_) | SdkError::TimeoutError(_)
        ) {
            return Self::NetworkError(format!("{} failed: {}", operation, detail));
        }

        let code = err
            .as_service_error()
            .and_then(|service_error| service_error.code())
            .unwrap_or("Unknown")
            .to_string();

        Self::from_code(operation, queue, &code, detail)
    }

    fn from_code(operation: &str, queue: &str, code: &str, message: String) -> Self {
        match code {
            "InvalidClientTokenId"
            | "UnrecognizedClientException"
            | "SignatureDoesNotMatch"
            | "IncompleteSignature"
            | "MissingAuthenticationToken"
            | "ExpiredToken"
            | "InvalidSecurity" => Self::Authentication(message),
            "AccessDenied" | "AccessDeniedException" => Self::AccessDenied {
                operation: operation.to_string(),
                message,
            },
            "AWS.SimpleQueueService.NonExistentQueue" | "QueueDoesNotExist" => {
                Self::QueueNotFound(queue.to_string())
            }
            _ => Self::ServiceError {
                code: code.to_string(),
                message,
            },
        }
    }

    /// Map AWS error to QueueError
    pub fn to_queue_error(self) -> QueueError {
        match self {
            Self::Authentication(msg) => QueueError::AuthenticationFailed { message: msg },
            Self::AccessDenied { operation, .. } => QueueError::PermissionDenied { operation },
            Self::NetworkError(msg) => QueueError::ConnectionFailed { message: msg },
            Self::ServiceError { code, message } => QueueError::ProviderError {
                provider: ProviderType::AwsSqs.to_string(),
                code,
                message,
            },
            Self::QueueNotFound(queue) => QueueError::QueueNotFound { queue_name: queue },
            Self::ConfigurationError(msg) => {
                QueueError::ConfigurationError(ConfigurationError::Invalid { message: msg })
            }
        }
    }
}

// ============================================================================
// AwsSqsProvider
// ============================================================================

/// AWS SQS queue client
pub struct AwsSqsProvider {
    client: Client,
    config: AwsSqsConfig,
}

impl AwsSqsProvider {
    /// Build an SQS client from configuration
    ///
    /// # Errors
    ///
    /// Returns error if the region is empty. Credentials are resolved lazily
    /// by the SDK, so missing or rejected credentials surface on the first
    /// request, [`QueueClient::resolve_queue`], not here.
    pub async fn connect(config: AwsSqsConfig) -> Result<Self, QueueError> {
        if config.region.trim().is_empty() {
            return Err(AwsError::ConfigurationError("Region cannot be empty".to_string())
                .to_queue_error());
        }

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));

        if let Some(profile) = &config.profile {
            loader = loader.profile_name(profile);
        }

        if let Some(endpoint) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }

        let sdk_config = loader.load().await;

        debug!(
            region = %config.region,
            profile = ?config.profile,
            endpoint = ?config.endpoint_url,
            "AWS SQS client configured"
        );

        Ok(Self::from_client(Client::new(&sdk_config), config))
    }

    /// Wrap an already configured SDK client
    pub fn from_client(client: Client, config: AwsSqsConfig) -> Self {
        Self { client, config }
    }

    async fn lookup_queue_url(
        &self,
        name: &str,
        owner_account_id: Option<&str>,
    ) -> Result<QueueUrl, AwsError> {
        let output = self
            .client
            .get_queue_url()
            .queue_name(name)
            .set_queue_owner_aws_account_id(owner_account_id.map(str::to_string))
            .send()
            .await
            .map_err(|e| AwsError::from_sdk("GetQueueUrl", name, e))?;

        output
            .queue_url()
            .map(QueueUrl::new)
            .ok_or_else(|| AwsError::ServiceError {
                code: "MissingQueueUrl".to_string(),
                message: format!("GetQueueUrl returned no URL for {}", name),
            })
    }

    async fn verify_queue_access(&self, queue: &QueueUrl) -> Result<(), AwsError> {
        self.client
            .get_queue_attributes()
            .queue_url(queue.as_str())
            .attribute_names(QueueAttributeName::QueueArn)
            .send()
            .await
            .map_err(|e| AwsError::from_sdk("GetQueueAttributes", queue.queue_name(), e))?;
        Ok(())
    }
}

impl fmt::Debug for AwsSqsProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsSqsProvider")
            .field("region", &self.config.region)
            .field("profile", &self.config.profile)
            .field("endpoint_url", &self.config.endpoint_url)
            .finish()
    }
}

/// Convert an SDK message into the provider-neutral form
fn convert_message(message: aws_sdk_sqs::types::Message) -> Result<ReceivedMessage, AwsError> {
    let missing = |field: &str| AwsError::ServiceError {
        code: "MalformedMessage".to_string(),
        message: format!("ReceiveMessage returned a message without {}", field),
    };

    let message_id: MessageId = message
        .message_id
        .ok_or_else(|| missing("MessageId"))?
        .parse()
        .map_err(|_| missing("MessageId"))?;
    let receipt_handle = ReceiptHandle::new(
        message
            .receipt_handle
            .ok_or_else(|| missing("ReceiptHandle"))?,
    );

    let mut received = ReceivedMessage::new(message_id, receipt_handle);
    received.md5_of_body = message.md5_of_body;
    received.body = message.body;
    received.md5_of_message_attributes = message.md5_of_message_attributes;

    for (name, value) in message.attributes.unwrap_or_default() {
        received.attributes.insert(name.as_str().to_string(), value);
    }

    for (name, value) in message.message_attributes.unwrap_or_default() {
        received.message_attributes.insert(
            name,
            MessageAttributeValue {
                data_type: value.data_type,
                string_value: value.string_value,
                binary_value: value.binary_value.map(|blob| Bytes::from(blob.into_inner())),
            },
        );
    }

    Ok(received)
}

#[async_trait]
impl QueueClient for AwsSqsProvider {
    async fn resolve_queue(&self, locator: &QueueLocator) -> Result<QueueUrl, QueueError> {
        let queue_url = match locator {
            QueueLocator::Url(url) => {
                self.verify_queue_access(url)
                    .await
                    .map_err(|e| e.to_queue_error())?;
                url.clone()
            }
            QueueLocator::Name(name) => self
                .lookup_queue_url(name.as_str(), None)
                .await
                .map_err(|e| e.to_queue_error())?,
            QueueLocator::Arn {
                region,
                account_id,
                name,
                ..
            } => {
                if region != &self.config.region {
                    return Err(AwsError::ConfigurationError(format!(
                        "queue ARN is in region {} but the client is configured for {}; \
                         pass --region {}",
                        region, self.config.region, region
                    ))
                    .to_queue_error());
                }
                self.lookup_queue_url(name.as_str(), Some(account_id.as_str()))
                    .await
                    .map_err(|e| e.to_queue_error())?
            }
        };

        debug!(locator = %locator, queue_url = %queue_url, "Resolved queue");
        Ok(queue_url)
    }

    async fn approximate_depth(&self, queue: &QueueUrl) -> Result<Option<u64>, QueueError> {
        let output = self
            .client
            .get_queue_attributes()
            .queue_url(queue.as_str())
            .attribute_names(QueueAttributeName::ApproximateNumberOfMessages)
            .send()
            .await
            .map_err(|e| {
                AwsError::from_sdk("GetQueueAttributes", queue.queue_name(), e).to_queue_error()
            })?;

        Ok(output
            .attributes()
            .and_then(|attributes| attributes.get(&QueueAttributeName::ApproximateNumberOfMessages))
            .and_then(|value| value.parse::<u64>().ok()))
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

        let wait_time_seconds = options
            .wait_time
            .min(ProviderType::AwsSqs.max_wait_time())
            .as_secs();

        let mut request = self
            .client
            .receive_message()
            .queue_url(queue.as_str())
            .max_number_of_messages(max_messages as i32)
            .wait_time_seconds(wait_time_seconds as i32)
            .message_system_attribute_names(MessageSystemAttributeName::All)
            .message_attribute_names("All");

        if let Some(visibility) = options.visibility_timeout {
            let seconds = visibility.as_secs().min(MAX_VISIBILITY_TIMEOUT_SECS);
            request = request.visibility_timeout(seconds as i32);
        }

        let output = request.send().await.map_err(|e| {
            AwsError::from_sdk("ReceiveMessage", queue.queue_name(), e).to_queue_error()
        })?;

        output
            .messages
            .unwrap_or_default()
            .into_iter()
            .map(|message| convert_message(message).map_err(|e| e.to_queue_error()))
            .collect()
    }

    async fn delete_batch(
        &self,
        queue: &QueueUrl,
        entries: &[DeleteRequestEntry],
    ) -> Result<(), QueueError> {
        if entries.is_empty() {
            return Ok(());
        }
        if entries.len() > MAX_BATCH_SIZE {
            return Err(QueueError::BatchTooLarge {
                size: entries.len(),
                max_size: MAX_BATCH_SIZE,
            });
        }

        // Positional ids: a redelivered message can appear twice in one chunk
        // and SQS rejects batches whose entry ids repeat.
        let request_entries = entries
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                DeleteMessageBatchRequestEntry::builder()
                    .id(index.to_string())
                    .receipt_handle(entry.receipt_handle.handle())
                    .build()
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| {
                AwsError::ConfigurationError(format!("Invalid delete batch entry: {}", e))
                    .to_queue_error()
            })?;

        let output = self
            .client
            .delete_message_batch()
            .queue_url(queue.as_str())
            .set_entries(Some(request_entries))
            .send()
            .await
            .map_err(|e| {
                AwsError::from_sdk("DeleteMessageBatch", queue.queue_name(), e).to_queue_error()
            })?;

        for failure in output.failed() {
            let message_id = failure
                .id()
                .parse::<usize>()
                .ok()
                .and_then(|index| entries.get(index))
                .map(|entry| entry.id.as_str())
                .unwrap_or_else(|| failure.id());
            warn!(
                queue = %queue,
                message_id = %message_id,
                code = %failure.code(),
                reason = failure.message().unwrap_or_default(),
                "SQS rejected a batch delete entry"
            );
        }

        debug!(
            queue = %queue,
            deleted = output.successful().len(),
            rejected = output.failed().len(),
            "Batch delete completed"
        );
        Ok(())
    }

    fn provider_type(&self) -> ProviderType {
        ProviderType::AwsSqs
    }
}
