//! Ingest command: the ingress HTTP server.

use std::sync::Arc;

use tracing::info;

use dora_config::{IngestSettings, QueueSettings};
use dora_ingest::{router, IngestState};
use dora_queue::JobQueue;

use crate::commands::{build_queue, shutdown_signal};
use crate::error::Result;

/// Serve `POST /trigger` and `GET /health` until SIGINT/SIGTERM.
pub async fn execute() -> Result<()> {
    let queue_settings = QueueSettings::from_env()?;
    let ingest_settings = IngestSettings::from_env()?;

    let queue = build_queue(&queue_settings)?;
    // The stream must exist before the first worker joins its group.
    queue.ensure_group().await?;

    let state = IngestState::new(
        queue as Arc<dyn JobQueue>,
        ingest_settings.secret.as_str(),
    );
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(ingest_settings.addr).await?;
    info!(addr = %ingest_settings.addr, "ingester listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("ingester exited");
    Ok(())
}
