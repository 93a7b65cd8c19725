//! Logging Consumers
//!
//! Workers that drain the telemetry queue in batches and emit each record as
//! a JSON line on the `telemetry` tracing target. Downstream collectors can
//! replace these; the queue contract is the only coupling.

use std::sync::Arc;

use streamer_core::{QueueError, TelemetryQueue};
use tracing::{debug, info, trace, warn};

/// Drain `queue` until it is closed and empty; returns the records seen
pub async fn run_consumer<Q>(id: usize, queue: Arc<Q>, batch_size: usize) -> Result<u64, QueueError>
where
    Q: TelemetryQueue + ?Sized,
{
    let mut delivered = 0_u64;
    debug!(consumer = id, batch_size, "Consumer started");

    while let Some(batch) = queue.dequeue(batch_size).await? {
        for record in &batch {
            match serde_json::to_string(record) {
                Ok(json) => info!(target: "telemetry", consumer = id, "{json}"),
                Err(e) => warn!(consumer = id, id = %record.id(), error = %e, "Failed to encode record"),
            }
        }
        delivered += batch.len() as u64;
        trace!(consumer = id, size = batch.len(), "Batch consumed");
    }

    debug!(consumer = id, delivered, "Consumer finished");
    Ok(delivered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use streamer_core::{InMemoryQueue, MemorySource, StreamerConfig, TelemetryStreamer};
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    #[tokio::test]
    async fn test_consumer_drains_until_closed() {
        let queue = Arc::new(InMemoryQueue::new());
        let source = MemorySource::new([
            ["host_id", "gpu_id", "utilization", "memory_used", "temperature"],
            ["h1", "g1", "1", "2", "3"],
            ["h1", "g2", "4", "5", "6"],
            ["h2", "g1", "7", "8", "9"],
        ]);
        let config = StreamerConfig::default()
            .with_stream_interval(Duration::ZERO)
            .with_loop(false);
        let streamer = TelemetryStreamer::with_source(config, source, Arc::clone(&queue));
        streamer.run(&CancellationToken::new()).await.unwrap();
        queue.close();

        let delivered = run_consumer(0, Arc::clone(&queue), 2).await.unwrap();
        assert_eq!(delivered, 3);
    }

    #[tokio::test]
    async fn test_consumer_rejects_zero_batch() {
        let queue = Arc::new(InMemoryQueue::new());
        let result = run_consumer(0, queue, 0).await;
        assert!(matches!(result, Err(QueueError::InvalidArgument(_))));
    }
}
