//! # sqs-peek CLI
//!
//! Command-line interface for draining an SQS queue into a JSON snapshot.
//!
//! This module provides:
//! - Argument parsing
//! - Layered configuration (defaults, TOML file, environment, flags)
//! - Logging initialization
//! - Wiring of the AWS provider, snapshot writer and drain coordinator

use clap::Parser;
use serde::{Deserialize, Serialize};
use sqs_peek_core::{DrainCoordinator, DrainError, DrainReport, DrainSession, JsonFileSnapshotWriter};
use sqs_peek_runtime::provider::DEFAULT_REGION;
use sqs_peek_runtime::{
    AwsSqsConfig, AwsSqsProvider, QueueError, QueueLocator, ReceiveOptions, ValidationError,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

/// Prefix of environment variables read into the configuration
pub const ENV_PREFIX: &str = "SQS_PEEK";

const MAX_WAIT_TIME_SECONDS: u64 = 20;
const MAX_VISIBILITY_TIMEOUT_SECONDS: u64 = 43_200;

// ============================================================================
// CLI Structure
// ============================================================================

/// sqs-peek - drain an SQS queue into a JSON snapshot
#[derive(Debug, Parser)]
#[command(name = "sqs-peek")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Drain an SQS queue into a JSON snapshot, optionally purging it")]
#[command(
    long_about = "Receives every message from an SQS queue with one poller per CPU, writes \
                  them to a JSON file and, with --purge, deletes them from the queue afterwards"
)]
pub struct Cli {
    /// Configuration file path (TOML)
    #[arg(long, env = "SQS_PEEK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Queue URL, ARN or name
    #[arg(short, long)]
    pub queue: Option<String>,

    /// AWS region [default: ap-south-1]
    #[arg(short, long)]
    pub region: Option<String>,

    /// Snapshot output file [default: queue_messages.json]
    #[arg(short, long, visible_alias = "fileName")]
    pub file_name: Option<PathBuf>,

    /// AWS shared-config profile
    #[arg(short, long)]
    pub profile: Option<String>,

    /// Delete every drained message after the snapshot is written
    #[arg(long)]
    pub purge: bool,

    /// Custom SQS endpoint, e.g. LocalStack
    #[arg(long)]
    pub endpoint_url: Option<String>,

    /// Long-poll wait per receive call, 0-20 seconds
    #[arg(long)]
    pub wait_time_seconds: Option<u64>,

    /// Visibility timeout for received messages, in seconds
    #[arg(long)]
    pub visibility_timeout: Option<u64>,

    /// Logging level or filter directive
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long)]
    pub json_logs: bool,
}

// ============================================================================
// CLI Error Types
// ============================================================================

/// CLI-specific errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Logging initialization failed: {message}")]
    Logging { message: String },

    #[error("Failed to create queue client: {0}")]
    Client(#[from] QueueError),

    #[error(transparent)]
    Drain(#[from] DrainError),
}

impl CliError {
    /// Name of the stage that failed
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::Logging { .. } => "logging",
            Self::Client(_) => sqs_peek_core::error::stage::SESSION,
            Self::Drain(e) => e.stage(),
        }
    }
}

/// Configuration-related errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Missing required configuration: {key}")]
    MissingRequired { key: String },

    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// ============================================================================
// Configuration Types
// ============================================================================

/// Merged configuration for one run
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CliConfig {
    /// Queue URL, ARN or name
    pub queue: Option<String>,
    pub region: String,
    pub profile: Option<String>,
    pub endpoint_url: Option<String>,
    /// Snapshot output file
    pub file_name: PathBuf,
    pub purge: bool,
    pub wait_time_seconds: u64,
    pub visibility_timeout: Option<u64>,
    pub logging: LoggingConfig,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            queue: None,
            region: DEFAULT_REGION.to_string(),
            profile: None,
            endpoint_url: None,
            file_name: PathBuf::from(sqs_peek_core::DEFAULT_OUTPUT_FILE),
            purge: false,
            wait_time_seconds: 0,
            visibility_timeout: None,
            logging: LoggingConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

/// Log format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum LogFormat {
    #[serde(rename = "text")]
    Text,
    #[serde(rename = "json")]
    Json,
}

impl CliConfig {
    /// Apply command-line flags on top of the loaded configuration
    pub fn apply_overrides(&mut self, cli: &Cli) {
        if let Some(queue) = &cli.queue {
            self.queue = Some(queue.clone());
        }
        if let Some(region) = &cli.region {
            self.region = region.clone();
        }
        if let Some(file_name) = &cli.file_name {
            self.file_name = file_name.clone();
        }
        if let Some(profile) = &cli.profile {
            self.profile = Some(profile.clone());
        }
        if let Some(endpoint_url) = &cli.endpoint_url {
            self.endpoint_url = Some(endpoint_url.clone());
        }
        if let Some(wait) = cli.wait_time_seconds {
            self.wait_time_seconds = wait;
        }
        if let Some(timeout) = cli.visibility_timeout {
            self.visibility_timeout = Some(timeout);
        }
        if let Some(level) = &cli.log_level {
            self.logging.level = level.clone();
        }
        if cli.purge {
            self.purge = true;
        }
        if cli.json_logs {
            self.logging.format = LogFormat::Json;
        }
    }

    /// Check the merged configuration before anything touches the network
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.queue_locator()?;

        if self.region.trim().is_empty() {
            return Err(ConfigError::MissingRequired {
                key: "region".to_string(),
            });
        }
        if self.file_name.as_os_str().is_empty() {
            return Err(ConfigError::MissingRequired {
                key: "file_name".to_string(),
            });
        }
        if self.wait_time_seconds > MAX_WAIT_TIME_SECONDS {
            return Err(ConfigError::InvalidValue {
                key: "wait_time_seconds".to_string(),
                message: format!("must be at most {} seconds", MAX_WAIT_TIME_SECONDS),
            });
        }
        if let Some(timeout) = self.visibility_timeout {
            if timeout > MAX_VISIBILITY_TIMEOUT_SECONDS {
                return Err(ConfigError::InvalidValue {
                    key: "visibility_timeout".to_string(),
                    message: format!("must be at most {} seconds", MAX_VISIBILITY_TIMEOUT_SECONDS),
                });
            }
        }

        Ok(())
    }

    pub fn queue_locator(&self) -> Result<QueueLocator, ConfigError> {
        let queue = self
            .queue
            .as_deref()
            .filter(|queue| !queue.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingRequired {
                key: "queue".to_string(),
            })?;
        Ok(queue.parse()?)
    }

    pub fn aws_config(&self) -> AwsSqsConfig {
        AwsSqsConfig {
            region: self.region.clone(),
            profile: self.profile.clone(),
            endpoint_url: self.endpoint_url.clone(),
        }
    }

    pub fn receive_options(&self) -> ReceiveOptions {
        let options =
            ReceiveOptions::new().with_wait_time(Duration::from_secs(self.wait_time_seconds));
        match self.visibility_timeout {
            Some(timeout) => options.with_visibility_timeout(Duration::from_secs(timeout)),
            None => options,
        }
    }

    /// Build the drain session; worker count is always the host's parallelism
    pub fn drain_session(&self) -> Result<DrainSession, ConfigError> {
        Ok(DrainSession::new(self.queue_locator()?, self.file_name.clone())
            .with_purge(self.purge)
            .with_receive_options(self.receive_options()))
    }
}

// ============================================================================
// Configuration Loading
// ============================================================================

/// Load configuration from defaults, file, environment and flags, in that order
pub fn load_configuration(cli: &Cli) -> Result<CliConfig, ConfigError> {
    load_configuration_with_env(cli, None)
}

/// As [`load_configuration`], reading environment variables from `env`
/// instead of the process environment when given
pub fn load_configuration_with_env(
    cli: &Cli,
    env: Option<config::Map<String, String>>,
) -> Result<CliConfig, ConfigError> {
    let mut builder = config::Config::builder();

    if let Some(path) = &cli.config {
        ensure_config_file(path)?;
        builder = builder.add_source(
            config::File::from(path.as_path())
                .format(config::FileFormat::Toml)
                .required(true),
        );
    }

    let loaded = builder
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .source(env),
        )
        .build()?;

    let mut config: CliConfig = loaded.try_deserialize()?;
    config.apply_overrides(cli);
    Ok(config)
}

fn ensure_config_file(path: &Path) -> Result<(), ConfigError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(ConfigError::FileNotFound {
            path: path.to_path_buf(),
        })
    }
}

// ============================================================================
// Logging
// ============================================================================

/// `RUST_LOG` wins over the configured level
pub fn build_env_filter(level: &str) -> Result<EnvFilter, CliError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(level).map_err(|e| CliError::Logging {
            message: format!("invalid log level '{}': {}", level, e),
        }),
    }
}

/// Install the global subscriber; logs go to stderr so stdout stays clean
fn initialize_logging(logging: &LoggingConfig) -> Result<(), CliError> {
    let registry = tracing_subscriber::registry().with(build_env_filter(&logging.level)?);

    let installed = match logging.format {
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };

    installed.map_err(|e| CliError::Logging {
        message: e.to_string(),
    })
}

// ============================================================================
// Main Entry Point
// ============================================================================

/// Main CLI entry point
pub async fn run_cli() -> Result<DrainReport, CliError> {
    run(Cli::parse()).await
}

/// Run one drain with already-parsed arguments
pub async fn run(cli: Cli) -> Result<DrainReport, CliError> {
    let config = load_configuration(&cli)?;
    config.validate()?;
    initialize_logging(&config.logging)?;

    let session = config.drain_session()?;
    info!(
        queue = %session.queue,
        region = %config.region,
        profile = config.profile.as_deref().unwrap_or("<default chain>"),
        output = %session.output().display(),
        purge = session.purge,
        "Starting sqs-peek"
    );

    let client = AwsSqsProvider::connect(config.aws_config()).await?;
    let writer = JsonFileSnapshotWriter::new(session.output());
    let coordinator = DrainCoordinator::new(Arc::new(client), Arc::new(writer), session);

    let drained = coordinator.drain().await?;
    println!("Fetched {} records", drained.messages.len());

    let report = coordinator.finish(drained).await?;
    if let Some(purge) = &report.purge {
        println!("Purged {} records", purge.entries_deleted);
    }

    Ok(report)
}
