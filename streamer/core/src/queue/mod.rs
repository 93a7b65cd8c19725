//! Telemetry Queue
//!
//! The shared FIFO buffer that decouples producer pace from consumer pace.
//!
//! # Contract
//!
//! - `enqueue` appends to the tail and wakes one waiting consumer
//! - `dequeue(n)` removes up to `n` records from the head, in arrival order,
//!   waiting while the queue is open and empty
//! - `close` is idempotent; once closed and drained, `dequeue` returns
//!   `Ok(None)` as the end-of-queue signal
//!
//! Producers and consumers only ever hold an `Arc` to a queue. Nothing in the
//! pipeline reaches into the buffer directly.
//!
//! ```text
//!  TelemetryStreamer ──enqueue──▶ ┌──────────────┐ ──dequeue(n)──▶ consumer 1
//!  Producer         ──enqueue──▶ │ InMemoryQueue │ ──dequeue(n)──▶ consumer 2
//!                                └──────────────┘ ──dequeue(n)──▶ ...
//! ```

mod in_memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::telemetry::Telemetry;

pub use in_memory::{InMemoryQueue, QueueStats};

/// Errors returned by queue operations
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    /// A caller-supplied argument is out of range
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The queue is at capacity and the record was not accepted
    #[error("queue is full (capacity {capacity})")]
    Full {
        /// Configured capacity
        capacity: usize,
    },

    /// The queue has been closed and accepts no more records
    #[error("queue is closed")]
    Closed,
}

/// A concurrency-safe FIFO of telemetry records
///
/// Implementations must serialize all mutations and must be cancel-safe:
/// dropping a pending `dequeue` future never loses records.
#[async_trait]
pub trait TelemetryQueue: Send + Sync {
    /// Append a record to the tail
    ///
    /// Waits only when the implementation applies backpressure.
    async fn enqueue(&self, record: Telemetry) -> Result<(), QueueError>;

    /// Remove up to `max_count` records from the head
    ///
    /// Waits while the queue is open and empty. Returns at least one record,
    /// or `Ok(None)` once the queue is closed and drained.
    async fn dequeue(&self, max_count: usize) -> Result<Option<Vec<Telemetry>>, QueueError>;

    /// Stop accepting records and release every waiter
    fn close(&self);

    /// Whether `close` has been called
    fn is_closed(&self) -> bool;
}
