//! Pipeline Configuration
//!
//! Configuration types for the telemetry queue and the streaming producer.
//! Values are supplied by the owning process (the daemon reads them from CLI
//! flags and environment variables); this module only holds and validates
//! them.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default delay between streamed records
pub const DEFAULT_STREAM_INTERVAL: Duration = Duration::from_millis(1000);

// ============================================================================
// Errors
// ============================================================================

/// Configuration errors, reported before any pipeline state is created
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// No source location was given
    #[error("source path cannot be empty")]
    EmptySourcePath,

    /// A queue capacity of zero can never accept a record
    #[error("queue capacity must be greater than zero")]
    InvalidCapacity,

    /// Batch sizes must be at least one
    #[error("batch size must be greater than zero")]
    InvalidBatchSize,
}

// ============================================================================
// Queue Configuration
// ============================================================================

/// What `enqueue` does when a bounded queue is at capacity
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FullPolicy {
    /// Wait until a consumer makes room (default)
    #[default]
    Block,
    /// Fail immediately with `QueueError::Full`
    Reject,
}

impl FullPolicy {
    /// Parse a policy name, case-insensitively
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "block" | "wait" => Some(Self::Block),
            "reject" | "fail" => Some(Self::Reject),
            _ => None,
        }
    }
}

/// Configuration for an in-memory telemetry queue
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Maximum queued records (None = unbounded)
    pub capacity: Option<usize>,
    /// Behaviour of `enqueue` at capacity
    pub full_policy: FullPolicy,
}

impl QueueConfig {
    /// An unbounded queue; `enqueue` never waits
    #[must_use]
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// A queue holding at most `capacity` records
    #[must_use]
    pub fn bounded(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            ..Self::default()
        }
    }

    /// Set the full policy
    #[must_use]
    pub fn with_full_policy(mut self, policy: FullPolicy) -> Self {
        self.full_policy = policy;
        self
    }

    /// Check the configuration
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidCapacity`] for a capacity of zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == Some(0) {
            return Err(ConfigError::InvalidCapacity);
        }
        Ok(())
    }
}

// ============================================================================
// Streamer Configuration
// ============================================================================

/// Configuration for the streaming producer
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamerConfig {
    /// Path to the telemetry CSV file
    pub source_path: PathBuf,

    /// Delay between records (zero = as fast as the queue accepts them)
    pub stream_interval: Duration,

    /// Restart from the top of the source at end of file
    pub loop_source: bool,

    /// Discard the first row of every pass
    pub skip_header: bool,
}

impl Default for StreamerConfig {
    fn default() -> Self {
        Self {
            source_path: PathBuf::new(),
            stream_interval: DEFAULT_STREAM_INTERVAL,
            loop_source: true,
            skip_header: true,
        }
    }
}

impl StreamerConfig {
    /// Create a configuration for the given source with default pacing
    pub fn new(source_path: impl Into<PathBuf>) -> Self {
        Self {
            source_path: source_path.into(),
            ..Self::default()
        }
    }

    /// Set the delay between records
    #[must_use]
    pub fn with_stream_interval(mut self, interval: Duration) -> Self {
        self.stream_interval = interval;
        self
    }

    /// Enable or disable looping over the source
    #[must_use]
    pub fn with_loop(mut self, loop_source: bool) -> Self {
        self.loop_source = loop_source;
        self
    }

    /// Enable or disable header skipping
    #[must_use]
    pub fn with_skip_header(mut self, skip_header: bool) -> Self {
        self.skip_header = skip_header;
        self
    }

    /// Check the configuration
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptySourcePath`] if no source was set.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.source_path.as_os_str().is_empty() {
            return Err(ConfigError::EmptySourcePath);
        }
        Ok(())
    }
}
