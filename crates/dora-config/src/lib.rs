//! # dora-config
//!
//! Environment-variable configuration, validated once at startup.
//!
//! Each service loads only the sections it needs — the ingester never asks
//! for graph-database credentials, the graph service never asks for the
//! ingress secret. A missing required variable is a fatal startup error,
//! never a runtime surprise.

mod error;
mod settings;

pub use error::{ConfigError, Result};
pub use settings::{
    GraphDbSettings, GraphServiceSettings, IngestSettings, QueueSettings, WorkerSettings,
};
