//! In-Memory Queue
//!
//! A `VecDeque` guarded by a single `parking_lot::Mutex`, with two
//! `tokio::sync::Notify` conditions:
//!
//! - `not_empty`: a record arrived or the queue closed
//! - `not_full`: room was made or the queue closed
//!
//! Waiters register interest *before* checking state and re-check after every
//! wake, so a notification can never slip between the check and the wait.

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::debug;

use super::{QueueError, TelemetryQueue};
use crate::config::{ConfigError, FullPolicy, QueueConfig};
use crate::telemetry::Telemetry;

/// Snapshot of queue counters
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Records accepted
    pub enqueued: u64,
    /// Records handed to consumers
    pub dequeued: u64,
    /// Records refused because the queue was full
    pub rejected: u64,
    /// Largest queue length observed
    pub high_water_mark: usize,
    /// Current queue length
    pub len: usize,
}

/// Mutable queue state, only touched under the lock
#[derive(Debug, Default)]
struct QueueState {
    items: VecDeque<Telemetry>,
    closed: bool,
    enqueued: u64,
    dequeued: u64,
    rejected: u64,
    high_water_mark: usize,
}

/// Outcome of a single attempt to take a batch
enum Take {
    Batch(Vec<Telemetry>),
    Drained,
    Empty,
}

/// Outcome of a single attempt to append
enum Put {
    Accepted,
    AtCapacity(Telemetry),
}

/// In-memory telemetry queue with optional capacity
pub struct InMemoryQueue {
    state: Mutex<QueueState>,
    not_empty: Notify,
    not_full: Notify,
    config: QueueConfig,
}

impl Default for InMemoryQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("InMemoryQueue")
            .field("len", &state.items.len())
            .field("closed", &state.closed)
            .field("config", &self.config)
            .finish()
    }
}

impl InMemoryQueue {
    /// Create an unbounded queue
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            not_empty: Notify::new(),
            not_full: Notify::new(),
            config: QueueConfig::unbounded(),
        }
    }

    /// Create a queue from configuration
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidCapacity`] for a zero capacity.
    pub fn with_config(config: QueueConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let initial = config.capacity.unwrap_or(0);
        Ok(Self {
            state: Mutex::new(QueueState {
                items: VecDeque::with_capacity(initial),
                ..QueueState::default()
            }),
            not_empty: Notify::new(),
            not_full: Notify::new(),
            config,
        })
    }

    /// Create a queue holding at most `capacity` records, blocking when full
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidCapacity`] for a zero capacity.
    pub fn bounded(capacity: usize) -> Result<Self, ConfigError> {
        Self::with_config(QueueConfig::bounded(capacity))
    }

    /// Configured capacity (None = unbounded)
    #[must_use]
    pub fn capacity(&self) -> Option<usize> {
        self.config.capacity
    }

    /// Configured full policy
    #[must_use]
    pub fn full_policy(&self) -> FullPolicy {
        self.config.full_policy
    }

    /// Number of queued records
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    /// Whether no records are queued
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.lock().items.is_empty()
    }

    /// Counter snapshot
    #[must_use]
    pub fn stats(&self) -> QueueStats {
        let state = self.state.lock();
        QueueStats {
            enqueued: state.enqueued,
            dequeued: state.dequeued,
            rejected: state.rejected,
            high_water_mark: state.high_water_mark,
            len: state.items.len(),
        }
    }

    /// Append without waiting
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Full`] at capacity, whatever the full policy,
    /// and [`QueueError::Closed`] after `close`.
    pub fn try_enqueue(&self, record: Telemetry) -> Result<(), QueueError> {
        match self.put(record)? {
            Put::Accepted => Ok(()),
            Put::AtCapacity(_) => Err(self.reject()),
        }
    }

    /// Take up to `max_count` records without waiting
    ///
    /// Unlike [`TelemetryQueue::dequeue`], this may return an empty batch
    /// while the queue is open.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::InvalidArgument`] when `max_count` is zero.
    pub fn try_dequeue(&self, max_count: usize) -> Result<Option<Vec<Telemetry>>, QueueError> {
        check_batch_size(max_count)?;
        match self.take(max_count) {
            Take::Batch(batch) => Ok(Some(batch)),
            Take::Drained => Ok(None),
            Take::Empty => Ok(Some(Vec::new())),
        }
    }

    fn put(&self, record: Telemetry) -> Result<Put, QueueError> {
        {
            let mut state = self.state.lock();
            if state.closed {
                return Err(QueueError::Closed);
            }
            if let Some(capacity) = self.config.capacity {
                if state.items.len() >= capacity {
                    return Ok(Put::AtCapacity(record));
                }
            }
            state.items.push_back(record);
            state.enqueued += 1;
            state.high_water_mark = state.high_water_mark.max(state.items.len());
        }
        self.not_empty.notify_one();
        Ok(Put::Accepted)
    }

    fn reject(&self) -> QueueError {
        let mut state = self.state.lock();
        state.rejected += 1;
        QueueError::Full {
            capacity: self.config.capacity.unwrap_or(usize::MAX),
        }
    }

    fn take(&self, max_count: usize) -> Take {
        let (batch, remaining) = {
            let mut state = self.state.lock();
            if state.items.is_empty() {
                return if state.closed {
                    Take::Drained
                } else {
                    Take::Empty
                };
            }
            let count = max_count.min(state.items.len());
            let batch: Vec<Telemetry> = state.items.drain(..count).collect();
            state.dequeued += batch.len() as u64;
            (batch, state.items.len())
        };

        // Pass the wake on if other consumers can still be served
        if remaining > 0 {
            self.not_empty.notify_one();
        }
        if self.config.capacity.is_some() {
            self.not_full.notify_waiters();
        }
        Take::Batch(batch)
    }
}

fn check_batch_size(max_count: usize) -> Result<(), QueueError> {
    if max_count == 0 {
        return Err(QueueError::InvalidArgument(
            "batch size must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

#[async_trait]
impl TelemetryQueue for InMemoryQueue {
    async fn enqueue(&self, record: Telemetry) -> Result<(), QueueError> {
        let mut record = record;
        loop {
            let notified = self.not_full.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            match self.put(record)? {
                Put::Accepted => return Ok(()),
                Put::AtCapacity(returned) => {
                    if self.config.full_policy == FullPolicy::Reject {
                        return Err(self.reject());
                    }
                    record = returned;
                }
            }

            notified.await;
        }
    }

    async fn dequeue(&self, max_count: usize) -> Result<Option<Vec<Telemetry>>, QueueError> {
        check_batch_size(max_count)?;
        loop {
            let notified = self.not_empty.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            match self.take(max_count) {
                Take::Batch(batch) => return Ok(Some(batch)),
                Take::Drained => return Ok(None),
                Take::Empty => {}
            }

            notified.await;
        }
    }

    fn close(&self) {
        let newly_closed = {
            let mut state = self.state.lock();
            !std::mem::replace(&mut state.closed, true)
        };
        if newly_closed {
            debug!(remaining = self.len(), "Telemetry queue closed");
        }
        self.not_empty.notify_waiters();
        self.not_full.notify_waiters();
    }

    fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}
