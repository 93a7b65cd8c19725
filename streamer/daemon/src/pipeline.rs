//! Pipeline Wiring
//!
//! Owns the one queue of the process and hands `Arc` handles to the streamer
//! and to every consumer:
//!
//! ```text
//!   CsvSource ──▶ TelemetryStreamer ──▶ InMemoryQueue ──▶ consumer 0..N
//!                        │                    ▲
//!                        └── stops ──close()──┘
//! ```
//!
//! Once the streamer stops for any reason, no further records will be
//! produced, so the queue is closed. Consumers drain what remains and exit.

use std::sync::Arc;

use anyhow::{Context, Result};
use streamer_core::{
    ConfigError, InMemoryQueue, QueueConfig, QueueStats, StreamOutcome, StreamStats,
    StreamerConfig, TelemetryQueue, TelemetryStreamer,
};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Instrument};

use crate::consumer::run_consumer;

/// Configuration for the whole pipeline
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Streamer settings
    pub streamer: StreamerConfig,
    /// Queue settings
    pub queue: QueueConfig,
    /// Number of consumer tasks
    pub consumers: usize,
    /// Records per dequeue
    pub batch_size: usize,
}

impl PipelineConfig {
    /// Check every part of the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.streamer.validate()?;
        self.queue.validate()?;
        if self.batch_size == 0 {
            return Err(ConfigError::InvalidBatchSize);
        }
        Ok(())
    }
}

/// Summary of a finished pipeline run
#[derive(Clone, Debug)]
pub struct PipelineReport {
    /// How the streamer stopped
    pub outcome: StreamOutcome,
    /// Streamer counters
    pub stream: StreamStats,
    /// Queue counters
    pub queue: QueueStats,
    /// Records taken by consumers
    pub delivered: u64,
}

/// A source-to-consumers telemetry pipeline
pub struct Pipeline {
    config: PipelineConfig,
    queue: Arc<InMemoryQueue>,
    streamer: TelemetryStreamer<streamer_core::CsvSource, InMemoryQueue>,
}

impl Pipeline {
    /// Build the queue and streamer; nothing runs until [`Pipeline::run`]
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate().context("Invalid pipeline configuration")?;

        let queue = Arc::new(
            InMemoryQueue::with_config(config.queue.clone()).context("Invalid queue configuration")?,
        );
        let streamer = TelemetryStreamer::new(config.streamer.clone(), Arc::clone(&queue))
            .context("Failed to create telemetry streamer")?;

        if config.consumers == 0 {
            warn!("No in-process consumers configured; queued records are never drained");
        }

        Ok(Self {
            config,
            queue,
            streamer,
        })
    }

    /// Shared queue handle
    pub fn queue(&self) -> Arc<InMemoryQueue> {
        Arc::clone(&self.queue)
    }

    /// Run until the streamer finishes or `token` is cancelled, then drain
    pub async fn run(self, token: CancellationToken) -> Result<PipelineReport> {
        let mut consumers = JoinSet::new();
        for id in 0..self.config.consumers {
            let queue = Arc::clone(&self.queue);
            let batch_size = self.config.batch_size;
            consumers.spawn(
                run_consumer(id, queue, batch_size)
                    .instrument(tracing::info_span!("consumer", id)),
            );
        }

        let outcome = self.streamer.run(&token).await;

        // No further records will be produced
        self.queue.close();

        let mut delivered = 0;
        while let Some(joined) = consumers.join_next().await {
            delivered += joined
                .context("Consumer task panicked")?
                .context("Consumer failed")?;
        }

        let outcome = outcome.context("Telemetry streamer failed")?;
        let report = PipelineReport {
            outcome,
            stream: self.streamer.stats(),
            queue: self.queue.stats(),
            delivered,
        };

        info!(
            outcome = ?report.outcome,
            records = report.stream.records_enqueued,
            skipped = report.stream.rows_skipped,
            passes = report.stream.passes_completed,
            delivered = report.delivered,
            "Pipeline stopped"
        );
        Ok(report)
    }
}
