//! Record Producer
//!
//! Accepts parsed readings into the pipeline: assigns identity and ingestion
//! time, then enqueues. Every ingestion path goes through here, which is what
//! keeps timestamps monotonic across a run. The stamp and the enqueue happen
//! under one lock, so queue order matches timestamp order even when several
//! tasks share a producer.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::StreamerError;
use crate::queue::TelemetryQueue;
use crate::telemetry::TelemetryReading;

/// Result of offering a reading to the producer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delivery {
    /// The record was enqueued under this identifier
    Enqueued(Uuid),
    /// Cancellation won; nothing was enqueued
    Cancelled,
}

/// Stamps readings and hands them to a queue
pub struct Producer<Q: TelemetryQueue + ?Sized> {
    queue: Arc<Q>,
    last_stamp: Mutex<Option<DateTime<Utc>>>,
}

impl<Q: TelemetryQueue + ?Sized> Producer<Q> {
    /// Create a producer feeding `queue`
    pub fn new(queue: Arc<Q>) -> Self {
        Self {
            queue,
            last_stamp: Mutex::new(None),
        }
    }

    /// The queue this producer feeds
    #[must_use]
    pub fn queue(&self) -> &Arc<Q> {
        &self.queue
    }

    /// Stamp `reading` with the current time and enqueue it
    ///
    /// If the queue applies backpressure, the wait races `token`. A reading
    /// offered after cancellation is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`StreamerError::Queue`] if the queue refuses the record.
    pub async fn produce(
        &self,
        token: &CancellationToken,
        reading: TelemetryReading,
    ) -> Result<Delivery, StreamerError> {
        if token.is_cancelled() {
            return Ok(Delivery::Cancelled);
        }

        tokio::select! {
            biased;
            () = token.cancelled() => Ok(Delivery::Cancelled),
            result = self.stamp_and_enqueue(reading) => result.map(Delivery::Enqueued),
        }
    }

    async fn stamp_and_enqueue(&self, reading: TelemetryReading) -> Result<Uuid, StreamerError> {
        // Held across the enqueue
        let mut last = self.last_stamp.lock().await;
        let stamp = monotonic(*last, Utc::now());

        let record = reading.stamp(stamp);
        let id = record.id();
        self.queue.enqueue(record).await?;

        *last = Some(stamp);
        Ok(id)
    }
}

/// `now`, unless the clock stepped back past `previous`
fn monotonic(previous: Option<DateTime<Utc>>, now: DateTime<Utc>) -> DateTime<Utc> {
    match previous {
        Some(previous) if previous > now => previous,
        _ => now,
    }
}
