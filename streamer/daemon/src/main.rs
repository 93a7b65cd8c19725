//! Telemetry Streamer Daemon
//!
//! Streams GPU telemetry from a CSV file into an in-process queue drained by
//! a pool of consumers, until the file is exhausted or the process is told to
//! stop.
//!
//! # Usage
//!
//! ```bash
//! # Replay a file forever, one record per second
//! CSV_FILE_PATH=/data/gpu.csv telemetry-streamer
//!
//! # Single pass, as fast as consumers keep up, with backpressure
//! telemetry-streamer --csv-file-path gpu.csv --loop-csv false \
//!     --stream-interval-ms 0 --queue-capacity 1024
//!
//! # With record output
//! RUST_LOG=telemetry=info telemetry-streamer
//! ```
//!
//! # Environment Variables
//!
//! - `CSV_FILE_PATH`: Telemetry CSV to stream (required)
//! - `STREAM_INTERVAL_MS`: Delay between records (default: 1000)
//! - `LOOP_CSV`: Replay the file at end of source (default: true)
//! - `NO_HEADER`: The file has no header row (default: false)
//! - `QUEUE_CAPACITY`: Maximum queued records (default: unbounded)
//! - `QUEUE_FULL_POLICY`: "block" or "reject" at capacity (default: block)
//! - `CONSUMERS`: Number of consumer tasks (default: 1)
//! - `BATCH_SIZE`: Records per dequeue (default: 32)
//! - `RUST_LOG`: Log level (trace, debug, info, warn, error)
//!
//! # Signals
//!
//! - SIGTERM/SIGINT: Cancel the streamer, drain the queue, exit cleanly

mod consumer;
mod pipeline;

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser};
use streamer_core::{FullPolicy, QueueConfig, StreamerConfig};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::pipeline::{Pipeline, PipelineConfig};

/// Command-line arguments, each with an environment fallback
#[derive(Debug, Parser)]
#[command(name = "telemetry-streamer", version, about = "Stream GPU telemetry from CSV into an in-process queue")]
struct Args {
    /// Telemetry CSV file to stream
    #[arg(long, env = "CSV_FILE_PATH")]
    csv_file_path: PathBuf,

    /// Delay between records in milliseconds (0 = no pacing)
    #[arg(long, env = "STREAM_INTERVAL_MS", default_value_t = 1000)]
    stream_interval_ms: u64,

    /// Replay the file from the top at end of source
    #[arg(long, env = "LOOP_CSV", default_value = "true", action = ArgAction::Set, value_parser = parse_bool)]
    loop_csv: bool,

    /// Treat the first row as data rather than a header
    #[arg(long, env = "NO_HEADER")]
    no_header: bool,

    /// Maximum queued records (unbounded when unset)
    #[arg(long, env = "QUEUE_CAPACITY")]
    queue_capacity: Option<usize>,

    /// What to do at capacity: "block" or "reject"
    #[arg(long, env = "QUEUE_FULL_POLICY", default_value = "block", value_parser = parse_full_policy)]
    queue_full_policy: FullPolicy,

    /// Number of consumer tasks draining the queue
    #[arg(long, env = "CONSUMERS", default_value_t = 1)]
    consumers: usize,

    /// Records per dequeue
    #[arg(long, env = "BATCH_SIZE", default_value_t = 32)]
    batch_size: usize,
}

impl Args {
    fn pipeline_config(&self) -> PipelineConfig {
        let queue = QueueConfig {
            capacity: self.queue_capacity,
            full_policy: self.queue_full_policy,
        };

        PipelineConfig {
            streamer: StreamerConfig::new(&self.csv_file_path)
                .with_stream_interval(Duration::from_millis(self.stream_interval_ms))
                .with_loop(self.loop_csv)
                .with_skip_header(!self.no_header),
            queue,
            consumers: self.consumers,
            batch_size: self.batch_size,
        }
    }
}

/// Accepts the boolean spellings `1 t T TRUE true True 0 f F FALSE false False`
fn parse_bool(s: &str) -> Result<bool, String> {
    match s {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
        _ => Err(format!("invalid boolean: {s:?}")),
    }
}

fn parse_full_policy(s: &str) -> Result<FullPolicy, String> {
    FullPolicy::parse(s).ok_or_else(|| format!("unknown full policy {s:?} (expected block or reject)"))
}

/// Resolve when SIGINT or SIGTERM arrives
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        }
        () = terminate => {
            info!("Received SIGTERM, shutting down");
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("telemetry_streamer=info".parse()?)
                .add_directive("streamer_core=info".parse()?),
        )
        .with_target(true)
        .init();

    let args = Args::parse();
    info!(source = ?args.csv_file_path, "Starting telemetry streamer");

    let pipeline = Pipeline::new(args.pipeline_config())?;

    let token = CancellationToken::new();
    let signal_token = token.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        signal_token.cancel();
    });

    match pipeline.run(token).await {
        Ok(report) => {
            info!(
                outcome = ?report.outcome,
                delivered = report.delivered,
                "Telemetry streamer stopped cleanly"
            );
            Ok(())
        }
        Err(e) => {
            error!(error = format!("{e:#}"), "Telemetry streamer exited with error");
            Err(e)
        }
    }
}
