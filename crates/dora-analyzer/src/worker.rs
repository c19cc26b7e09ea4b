//! The long-lived job-processing loop.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{error, info, warn};

use dora_queue::{Delivery, JobQueue, QueueError};

use crate::Analyzer;

/// One worker: pull a job, process it to completion, publish, acknowledge,
/// repeat. Exactly one job is in flight at a time.
pub struct Worker {
    queue: Arc<dyn JobQueue>,
    analyzer: Analyzer,
}

impl Worker {
    pub fn new(queue: Arc<dyn JobQueue>, analyzer: Analyzer) -> Self {
        Self { queue, analyzer }
    }

    /// Run until the queue closes or `shutdown` fires.
    ///
    /// A shutdown signal stops the pull loop; it does not interrupt a job
    /// already being handled — the caller owns the grace period and may
    /// drop this future when it expires, returning the unacknowledged job
    /// to the pending set.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!("worker started");
        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    info!("shutdown requested, no longer pulling jobs");
                    break;
                }
                delivery = self.queue.next_job() => match delivery {
                    Ok(delivery) => self.handle(delivery).await,
                    Err(QueueError::Closed) => {
                        info!("job queue closed");
                        break;
                    }
                    Err(e) => {
                        error!(error = %e, "job queue failed irrecoverably");
                        break;
                    }
                }
            }
        }
        info!("worker stopped");
    }

    async fn handle(&self, delivery: Delivery) {
        info!(
            id = %delivery.id,
            repo = %delivery.job.repo_url,
            sha = %delivery.job.sha,
            "processing job"
        );

        let result = self.analyzer.process(&delivery.job).await;

        // Exactly one dispatch per consumed job, and the ack strictly after
        // it: a crash in between duplicates the dispatch, never loses it.
        match self.queue.publish_dispatch(&result).await {
            Ok(()) => {
                if let Err(e) = self.queue.ack(&delivery.id).await {
                    warn!(id = %delivery.id, error = %e, "ack failed, job may be redelivered");
                }
            }
            Err(e) => {
                // Left unacknowledged on purpose: redelivery retries the
                // whole (idempotent) job, including the publish.
                error!(id = %delivery.id, error = %e, "dispatch publish failed");
            }
        }
    }
}
