//! Check command: validate configuration and connectivity, touch nothing.

use tracing::{info, warn};

use dora_config::{
    GraphDbSettings, GraphServiceSettings, IngestSettings, QueueSettings, WorkerSettings,
};
use dora_queue::JobQueue;

use crate::commands::{build_queue, build_store};
use crate::error::Result;

/// Load every settings section, then prove the store and the queue are
/// reachable. Exits non-zero on the first problem, which makes it usable
/// as a deployment preflight.
pub async fn execute() -> Result<()> {
    info!("checking configuration...");

    let queue_settings = QueueSettings::from_env()?;
    let graph_settings = GraphDbSettings::from_env()?;
    let worker_settings = WorkerSettings::from_env()?;
    let service_settings = GraphServiceSettings::from_env()?;
    info!(
        analysis_stream = %queue_settings.analysis_stream,
        dispatch_stream = %queue_settings.dispatch_stream,
        group = %queue_settings.group,
        "queue configuration valid"
    );
    info!(
        graph_db = %graph_settings.url,
        graph_service = %service_settings.addr,
        mirrors = %worker_settings.mirror_dir.display(),
        parallelism = worker_settings.file_parallelism,
        "service configuration valid"
    );

    match IngestSettings::from_env() {
        Ok(settings) => info!(addr = %settings.addr, "ingester configuration valid"),
        Err(e) => warn!(error = %e, "ingester not configured (only needed by 'dora ingest')"),
    }

    if worker_settings.github_token.is_none() {
        warn!("GITHUB_TOKEN not set; forge requests will be rate-limited");
    }

    let store = build_store(&graph_settings).await?;
    drop(store);
    info!("graph store reachable, constraints ensured");

    let queue = build_queue(&queue_settings)?;
    queue.ensure_group().await?;
    info!("queue reachable, consumer group ensured");

    info!("all checks passed");
    Ok(())
}
