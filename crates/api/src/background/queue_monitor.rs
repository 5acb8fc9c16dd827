//! Periodic queue depth logging.
//!
//! Emits one structured log line per tick with the per-status job counts so
//! operators can follow backlog growth from the logs alone.

use std::time::Duration;

use promptforge_queue::ImageQueue;
use tokio_util::sync::CancellationToken;

/// Run the monitor loop until `cancel` is triggered.
pub async fn run(queue: ImageQueue, interval: Duration, cancel: CancellationToken) {
    tracing::info!(interval_secs = interval.as_secs(), "Queue monitor started");

    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Queue monitor stopping");
                break;
            }
            _ = ticker.tick() => {
                match queue.queue_stats().await {
                    Ok(stats) => {
                        tracing::info!(
                            pending = stats.pending,
                            processing = stats.processing,
                            completed = stats.completed,
                            failed = stats.failed,
                            cancelled = stats.cancelled,
                            average_processing_secs = stats.average_processing_secs,
                            "Queue depth",
                        );
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Queue monitor: failed to read stats");
                    }
                }
            }
        }
    }
}
