//! Subcommand implementations.

pub mod check;
pub mod graphd;
pub mod ingest;
pub mod worker;

mod shutdown;

pub(crate) use shutdown::shutdown_signal;

use std::sync::Arc;

use dora_config::{GraphDbSettings, QueueSettings};
use dora_queue::{RedisJobQueue, StreamConfig};
use dora_store::{SurrealConfig, SurrealGraphStore};

use crate::error::Result;

/// Build the Redis queue client from its settings section.
pub(crate) fn build_queue(settings: &QueueSettings) -> Result<Arc<RedisJobQueue>> {
    let stream_config = StreamConfig::new(
        settings.analysis_stream.clone(),
        settings.dispatch_stream.clone(),
        settings.group.clone(),
    );
    Ok(Arc::new(RedisJobQueue::new(
        &settings.redis_url,
        stream_config,
    )?))
}

/// Connect the graph store and ensure constraints are in place.
pub(crate) async fn build_store(settings: &GraphDbSettings) -> Result<SurrealGraphStore> {
    let config = SurrealConfig {
        url: settings.url.clone(),
        username: settings.username.clone(),
        password: settings.password.clone(),
        namespace: settings.namespace.clone(),
        database: settings.database.clone(),
    };
    let store = SurrealGraphStore::connect(&config).await?;
    dora_graph::GraphStore::ensure_constraints(&store).await?;
    Ok(store)
}
