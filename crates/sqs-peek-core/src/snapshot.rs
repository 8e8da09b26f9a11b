//! # Snapshot Persistence
//!
//! Serializes the drained messages to durable storage once the receive phase
//! has completed. The JSON file writer stores the full message list as one
//! JSON array, writing a temporary sibling file first and renaming it over
//! the destination so a reader never sees a partial snapshot.

use crate::error::SnapshotError;
use async_trait::async_trait;
use serde::Serialize;
use sqs_peek_runtime::ReceivedMessage;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;

/// Where and how much was written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotMetadata {
    pub location: String,
    pub message_count: usize,
    pub size_bytes: u64,
}

/// Destination for the drained message list
#[async_trait]
pub trait SnapshotWriter: Send + Sync {
    /// Persist every message, in order, with no field filtering
    async fn write(&self, messages: &[ReceivedMessage]) -> Result<SnapshotMetadata, SnapshotError>;
}

/// Writes the snapshot as an indented JSON array to a local file
///
/// An existing file at the destination is replaced.
#[derive(Debug, Clone)]
pub struct JsonFileSnapshotWriter {
    path: PathBuf,
}

impl JsonFileSnapshotWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_error(&self, source: std::io::Error) -> SnapshotError {
        SnapshotError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

/// JSON array with one-space indentation
pub fn to_json(messages: &[ReceivedMessage]) -> Result<Vec<u8>, SnapshotError> {
    let mut buffer = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b" ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    messages.serialize(&mut serializer)?;
    buffer.push(b'\n');
    Ok(buffer)
}

#[async_trait]
impl SnapshotWriter for JsonFileSnapshotWriter {
    async fn write(&self, messages: &[ReceivedMessage]) -> Result<SnapshotMetadata, SnapshotError> {
        let json = to_json(messages)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error(e))?;
        }

        // Write to temporary file first (atomic write pattern)
        let temp_path = self.temp_path();
        debug!(path = %temp_path.display(), bytes = json.len(), "Writing snapshot");

        let written = async {
            let mut file = fs::File::create(&temp_path).await?;
            file.write_all(&json).await?;
            file.sync_all().await?;
            fs::rename(&temp_path, &self.path).await
        }
        .await;

        if let Err(e) = written {
            let _ = fs::remove_file(&temp_path).await;
            return Err(self.io_error(e));
        }

        info!(
            path = %self.path.display(),
            messages = messages.len(),
            "Snapshot written"
        );

        Ok(SnapshotMetadata {
            location: self.path.display().to_string(),
            message_count: messages.len(),
            size_bytes: json.len() as u64,
        })
    }
}
