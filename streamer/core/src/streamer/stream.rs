//! Telemetry Streamer
//!
//! The control loop: open the source, skip the header, parse, stamp, enqueue,
//! pace, and reopen at end of source when looping.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::producer::{Delivery, Producer};
use super::{StreamOutcome, StreamState, StreamStats, StreamerError};
use crate::config::StreamerConfig;
use crate::queue::TelemetryQueue;
use crate::source::{CsvSource, RecordSource, RowReader};
use crate::telemetry::TelemetryReading;

/// Wait after a pass that produced nothing, when no stream interval is set
const EMPTY_PASS_BACKOFF: Duration = Duration::from_millis(100);

/// How a single pass over the source ended
enum PassEnd {
    EndOfSource { enqueued: u64 },
    Cancelled,
}

/// Atomic counters behind [`StreamStats`]
#[derive(Default)]
struct StreamStatsAtomic {
    rows_read: AtomicU64,
    records_enqueued: AtomicU64,
    rows_skipped: AtomicU64,
    passes_completed: AtomicU64,
}

impl StreamStatsAtomic {
    fn snapshot(&self) -> StreamStats {
        StreamStats {
            rows_read: self.rows_read.load(Ordering::Relaxed),
            records_enqueued: self.records_enqueued.load(Ordering::Relaxed),
            rows_skipped: self.rows_skipped.load(Ordering::Relaxed),
            passes_completed: self.passes_completed.load(Ordering::Relaxed),
        }
    }
}

/// Streams telemetry rows from a source into a queue
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// use streamer_core::{InMemoryQueue, StreamerConfig, TelemetryStreamer};
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), streamer_core::StreamerError> {
/// let queue = Arc::new(InMemoryQueue::new());
/// let config = StreamerConfig::new("telemetry.csv")
///     .with_stream_interval(Duration::from_millis(250))
///     .with_loop(false);
///
/// let streamer = TelemetryStreamer::new(config, Arc::clone(&queue))?;
/// let outcome = streamer.run(&CancellationToken::new()).await?;
/// # let _ = outcome;
/// # Ok(())
/// # }
/// ```
pub struct TelemetryStreamer<S: RecordSource, Q: TelemetryQueue + ?Sized> {
    config: StreamerConfig,
    source: S,
    producer: Producer<Q>,
    stats: StreamStatsAtomic,
    state: Mutex<StreamState>,
}

impl<Q: TelemetryQueue + ?Sized> TelemetryStreamer<CsvSource, Q> {
    /// Create a streamer reading the CSV file named in `config`
    ///
    /// # Errors
    ///
    /// Returns [`StreamerError::Config`] if the configuration is invalid.
    pub fn new(config: StreamerConfig, queue: Arc<Q>) -> Result<Self, StreamerError> {
        config.validate()?;
        let source = CsvSource::new(config.source_path.clone());
        Ok(Self::with_source(config, source, queue))
    }
}

impl<S: RecordSource, Q: TelemetryQueue + ?Sized> TelemetryStreamer<S, Q> {
    /// Create a streamer over an arbitrary source
    ///
    /// `config.source_path` is not consulted; the source knows its own location.
    pub fn with_source(config: StreamerConfig, source: S, queue: Arc<Q>) -> Self {
        Self {
            config,
            source,
            producer: Producer::new(queue),
            stats: StreamStatsAtomic::default(),
            state: Mutex::new(StreamState::Idle),
        }
    }

    /// Configuration in use
    #[must_use]
    pub fn config(&self) -> &StreamerConfig {
        &self.config
    }

    /// Current lifecycle state
    #[must_use]
    pub fn state(&self) -> StreamState {
        *self.state.lock()
    }

    /// Counter snapshot
    #[must_use]
    pub fn stats(&self) -> StreamStats {
        self.stats.snapshot()
    }

    /// Stream until the source is exhausted (no loop) or `token` is cancelled
    ///
    /// # Errors
    ///
    /// Returns [`StreamerError::Source`] when the source cannot be opened or
    /// read on any pass, and [`StreamerError::Queue`] when the queue refuses a
    /// record. Cancellation is not an error.
    pub async fn run(&self, token: &CancellationToken) -> Result<StreamOutcome, StreamerError> {
        self.set_state(StreamState::Streaming);
        info!(
            source = %self.source.location(),
            interval_ms = self.config.stream_interval.as_millis() as u64,
            loop_source = self.config.loop_source,
            "Telemetry streamer started"
        );

        let result = self.stream(token).await;
        let stats = self.stats();

        match &result {
            Ok(StreamOutcome::Completed) => {
                self.set_state(StreamState::Stopped);
                info!(
                    records = stats.records_enqueued,
                    skipped = stats.rows_skipped,
                    "Telemetry streamer reached end of source"
                );
            }
            Ok(StreamOutcome::Cancelled) => {
                self.set_state(StreamState::Cancelled);
                info!(
                    records = stats.records_enqueued,
                    skipped = stats.rows_skipped,
                    passes = stats.passes_completed,
                    "Telemetry streamer cancelled"
                );
            }
            Err(e) => {
                self.set_state(StreamState::Failed);
                warn!(error = %e, records = stats.records_enqueued, "Telemetry streamer failed");
            }
        }

        result
    }

    async fn stream(&self, token: &CancellationToken) -> Result<StreamOutcome, StreamerError> {
        loop {
            let enqueued = match self.stream_once(token).await? {
                PassEnd::Cancelled => return Ok(StreamOutcome::Cancelled),
                PassEnd::EndOfSource { enqueued } => enqueued,
            };

            let passes = self.stats.passes_completed.fetch_add(1, Ordering::Relaxed) + 1;
            debug!(pass = passes, records = enqueued, "Reached end of source");

            if !self.config.loop_source {
                return Ok(StreamOutcome::Completed);
            }

            if enqueued == 0 {
                let backoff = if self.config.stream_interval.is_zero() {
                    EMPTY_PASS_BACKOFF
                } else {
                    self.config.stream_interval
                };
                if !pace(token, backoff).await {
                    return Ok(StreamOutcome::Cancelled);
                }
            }
        }
    }

    /// One traversal of the source, from open to end of source
    async fn stream_once(&self, token: &CancellationToken) -> Result<PassEnd, StreamerError> {
        let mut reader = self.source.open().await?;

        if self.config.skip_header {
            match reader.next_row().await {
                Ok(Some(_)) => {}
                Ok(None) => return Ok(PassEnd::EndOfSource { enqueued: 0 }),
                Err(e) if e.is_row_error() => debug!(error = %e, "Skipping unreadable header"),
                Err(e) => return Err(e.into()),
            }
        }

        let pacing = !self.config.stream_interval.is_zero();
        let mut enqueued = 0;
        loop {
            // Unpaced rows must still let sibling tasks run
            if !pacing {
                tokio::task::yield_now().await;
            }
            if token.is_cancelled() {
                return Ok(PassEnd::Cancelled);
            }

            let row = match reader.next_row().await {
                Ok(Some(row)) => row,
                Ok(None) => return Ok(PassEnd::EndOfSource { enqueued }),
                Err(e) if e.is_row_error() => {
                    self.stats.rows_read.fetch_add(1, Ordering::Relaxed);
                    self.stats.rows_skipped.fetch_add(1, Ordering::Relaxed);
                    debug!(error = %e, "Skipping unreadable row");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            self.stats.rows_read.fetch_add(1, Ordering::Relaxed);

            let reading = match TelemetryReading::from_fields(row.as_slice()) {
                Ok(reading) => reading,
                Err(e) => {
                    self.stats.rows_skipped.fetch_add(1, Ordering::Relaxed);
                    debug!(error = %e, row = ?row, "Skipping malformed row");
                    continue;
                }
            };

            match self.producer.produce(token, reading).await? {
                Delivery::Cancelled => return Ok(PassEnd::Cancelled),
                Delivery::Enqueued(id) => {
                    self.stats.records_enqueued.fetch_add(1, Ordering::Relaxed);
                    enqueued += 1;
                    trace!(id = %id, "Record enqueued");
                }
            }

            if pacing && !pace(token, self.config.stream_interval).await {
                return Ok(PassEnd::Cancelled);
            }
        }
    }

    fn set_state(&self, state: StreamState) {
        *self.state.lock() = state;
    }
}

/// Sleep for `delay` unless cancelled first; false means cancelled
async fn pace(token: &CancellationToken, delay: Duration) -> bool {
    tokio::select! {
        () = token.cancelled() => false,
        () = tokio::time::sleep(delay) => true,
    }
}
