//! Graphd command: the graph-service HTTP server.

use std::sync::Arc;

use tracing::info;

use dora_config::{GraphDbSettings, GraphServiceSettings};
use dora_graph::GraphStore;
use dora_store::http;

use crate::commands::{build_store, shutdown_signal};
use crate::error::Result;

/// Serve graph reads and internal mutations until SIGINT/SIGTERM.
pub async fn execute() -> Result<()> {
    let graph_settings = GraphDbSettings::from_env()?;
    let service_settings = GraphServiceSettings::from_env()?;

    let store = build_store(&graph_settings).await?;
    let app = http::router(Arc::new(store) as Arc<dyn GraphStore>);

    let listener = tokio::net::TcpListener::bind(service_settings.addr).await?;
    info!(addr = %service_settings.addr, "graph service listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("graph service exited");
    Ok(())
}
