//! Worker command: the long-lived analysis loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{info, warn};

use dora_analyzer::{Analyzer, EsImportScanner, GitHubClient, GitSourceProvider, Worker};
use dora_config::{GraphDbSettings, QueueSettings, WorkerSettings};
use dora_queue::JobQueue;

use crate::commands::{build_queue, build_store, shutdown_signal};
use crate::error::Result;

/// Run one analyzer worker until SIGINT/SIGTERM.
///
/// All resources are constructed here after configuration validates, and
/// torn down when the loop exits. On shutdown the worker stops pulling
/// jobs; an in-flight job gets `SHUTDOWN_GRACE_SECS` to publish and ack
/// before the task is aborted and the job returns to the pending set.
pub async fn execute() -> Result<()> {
    let queue_settings = QueueSettings::from_env()?;
    let graph_settings = GraphDbSettings::from_env()?;
    let worker_settings = WorkerSettings::from_env()?;

    let store = build_store(&graph_settings).await?;

    let queue = build_queue(&queue_settings)?;
    queue.ensure_group().await?;
    info!(consumer = queue.consumer_name(), "joined consumer group");

    let github = GitHubClient::new(worker_settings.github_token.clone());
    let source = Arc::new(GitSourceProvider::new(
        worker_settings.mirror_dir.clone(),
        github,
    ));

    let analyzer = Analyzer::new(
        Arc::new(store),
        source,
        Arc::new(EsImportScanner::new()),
        worker_settings.file_parallelism,
    );
    let worker = Worker::new(queue.clone() as Arc<dyn JobQueue>, analyzer);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut worker_task = tokio::spawn(async move { worker.run(shutdown_rx).await });

    tokio::select! {
        _ = shutdown_signal() => {
            info!("signal received, draining");
            let _ = shutdown_tx.send(true);

            let grace = Duration::from_secs(worker_settings.shutdown_grace_secs);
            if tokio::time::timeout(grace, &mut worker_task).await.is_err() {
                warn!(
                    grace_secs = worker_settings.shutdown_grace_secs,
                    "grace period expired, aborting in-flight job"
                );
                worker_task.abort();
            }
        }
        _ = &mut worker_task => {
            // Queue closed underneath us; nothing left to drain.
        }
    }

    info!("worker exited");
    Ok(())
}
