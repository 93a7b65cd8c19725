//! Streaming Producer
//!
//! Drives rows from a [`RecordSource`](crate::source::RecordSource) into a
//! [`TelemetryQueue`](crate::queue::TelemetryQueue) at a controlled pace,
//! optionally replaying the source forever, until cancelled.
//!
//! # Lifecycle
//!
//! ```text
//!          run()
//!  Idle ───────────▶ Streaming ──end of source, no loop──▶ Stopped
//!                     │    ▲
//!                     │    └──end of source, loop: reopen
//!                     │
//!                     ├──token cancelled──▶ Cancelled
//!                     └──open/read failure──▶ Failed
//! ```
//!
//! Cancellation is a clean stop: `run` returns `Ok(StreamOutcome::Cancelled)`.
//! Malformed rows are skipped and counted in [`StreamStats::rows_skipped`];
//! they never end a run.

mod producer;
mod stream;

use thiserror::Error;

use crate::config::ConfigError;
use crate::queue::QueueError;
use crate::source::SourceError;

pub use producer::{Delivery, Producer};
pub use stream::TelemetryStreamer;

/// Fatal errors that end a streaming run
#[derive(Debug, Error)]
pub enum StreamerError {
    /// The streamer was constructed with an invalid configuration
    #[error("invalid streamer configuration: {0}")]
    Config(#[from] ConfigError),

    /// The source could not be opened or read
    #[error(transparent)]
    Source(#[from] SourceError),

    /// The queue refused a record (closed, or full under the reject policy)
    #[error("queue refused record: {0}")]
    Queue(#[from] QueueError),
}

/// How a successful run ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamOutcome {
    /// The source was exhausted and looping is disabled
    Completed,
    /// The cancellation token fired
    Cancelled,
}

/// Observable state of a streamer
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StreamState {
    /// Constructed, `run` not yet called
    #[default]
    Idle,
    /// Inside `run`
    Streaming,
    /// Finished at end of source
    Stopped,
    /// Stopped by cancellation
    Cancelled,
    /// Ended with a fatal error
    Failed,
}

impl StreamState {
    /// Whether the state ends a run
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped | Self::Cancelled | Self::Failed)
    }
}

/// Counters for a streamer, readable while it runs
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StreamStats {
    /// Data rows read (headers excluded)
    pub rows_read: u64,
    /// Records handed to the queue
    pub records_enqueued: u64,
    /// Rows dropped because they did not parse
    pub rows_skipped: u64,
    /// Passes that reached end of source
    pub passes_completed: u64,
}
