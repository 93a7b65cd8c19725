//! Streamer Core - Telemetry Queue and Streaming Producer
//!
//! This crate moves GPU telemetry from a row-oriented source into a shared,
//! in-process queue that any number of consumers read in batches. It owns the
//! two pieces with real concurrency and lifecycle semantics:
//!
//! - the queue, a FIFO with batch dequeue, close, and optional backpressure
//! - the streamer, a cancellable control loop that parses, stamps, paces, and
//!   enqueues records, optionally replaying its source forever
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐    rows     ┌───────────────────────────────┐
//! │ RecordSource │ ──────────▶ │       TelemetryStreamer       │
//! │  (CSV file)  │   reopen    │  parse → stamp → enqueue →    │
//! └──────────────┘ ◀────────── │  pace (races cancellation)    │
//!                              └───────────────┬───────────────┘
//!                                              │ Producer
//!                                              ▼
//!                              ┌───────────────────────────────┐
//!                              │    TelemetryQueue (FIFO)      │
//!                              └──────┬─────────┬─────────┬────┘
//!                                     │         │         │ dequeue(batch)
//!                                     ▼         ▼         ▼
//!                                 consumer  consumer  consumer
//! ```
//!
//! # Key Types
//!
//! - [`Telemetry`]: An accepted record with id and ingestion timestamp
//! - [`TelemetryReading`]: A parsed row before acceptance
//! - [`TelemetryQueue`]: The queue contract; [`InMemoryQueue`] implements it
//! - [`TelemetryStreamer`]: The streaming control loop
//! - [`Producer`]: Stamps and enqueues single readings
//! - [`RecordSource`]: Re-openable row source; [`CsvSource`] and [`MemorySource`]
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use streamer_core::{InMemoryQueue, StreamerConfig, TelemetryQueue, TelemetryStreamer};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let queue = Arc::new(InMemoryQueue::new());
//!     let token = CancellationToken::new();
//!
//!     let streamer = TelemetryStreamer::new(StreamerConfig::new("gpu.csv"), Arc::clone(&queue))?;
//!     let producer = tokio::spawn({
//!         let queue = Arc::clone(&queue);
//!         let token = token.clone();
//!         async move {
//!             let outcome = streamer.run(&token).await;
//!             queue.close();
//!             outcome
//!         }
//!     });
//!
//!     while let Some(batch) = queue.dequeue(32).await? {
//!         for record in batch {
//!             println!("{} {}", record.gpu_id(), record.temperature());
//!         }
//!     }
//!
//!     producer.await??;
//!     Ok(())
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`config`]: Queue and streamer configuration
//! - [`queue`]: The telemetry queue
//! - [`source`]: Row sources
//! - [`streamer`]: The streaming producer
//! - [`telemetry`]: Record types and row parsing

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod queue;
pub mod source;
pub mod streamer;
pub mod telemetry;

// Re-exports for convenience
pub use config::{ConfigError, FullPolicy, QueueConfig, StreamerConfig, DEFAULT_STREAM_INTERVAL};
pub use queue::{InMemoryQueue, QueueError, QueueStats, TelemetryQueue};
pub use source::{CsvSource, MemorySource, RawRow, RecordSource, RowReader, SourceError};
pub use streamer::{
    Delivery, Producer, StreamOutcome, StreamState, StreamStats, StreamerError, TelemetryStreamer,
};
pub use telemetry::{ParseError, Telemetry, TelemetryReading};
