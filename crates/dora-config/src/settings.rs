//! Per-service settings sections.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use crate::{ConfigError, Result};

fn required(var: &'static str) -> Result<String> {
    env::var(var)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(var))
}

fn optional(var: &str) -> Option<String> {
    env::var(var).ok().filter(|v| !v.is_empty())
}

fn parsed_or<T: FromStr>(var: &'static str, default: T) -> Result<T> {
    match optional(var) {
        Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
            var,
            reason: format!("could not parse {raw:?}"),
        }),
        None => Ok(default),
    }
}

/// Queue transport and stream names.
#[derive(Debug, Clone)]
pub struct QueueSettings {
    pub redis_url: String,
    pub analysis_stream: String,
    pub dispatch_stream: String,
    pub group: String,
}

impl QueueSettings {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            redis_url: required("REDIS_URL")?,
            analysis_stream: optional("ANALYSIS_STREAM")
                .unwrap_or_else(|| "doraemon:analysis".to_string()),
            dispatch_stream: optional("DISPATCH_STREAM")
                .unwrap_or_else(|| "doraemon:dispatch".to_string()),
            group: optional("ANALYSIS_GROUP").unwrap_or_else(|| "doraemon-analyzers".to_string()),
        })
    }
}

/// Graph database endpoint and credentials.
#[derive(Debug, Clone)]
pub struct GraphDbSettings {
    /// `mem://`, `rocksdb://<path>`, or `ws://<host>:<port>`.
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub namespace: String,
    pub database: String,
}

impl GraphDbSettings {
    pub fn from_env() -> Result<Self> {
        let username = optional("GRAPH_DB_USER");
        let password = optional("GRAPH_DB_PASSWORD");
        if username.is_some() != password.is_some() {
            return Err(ConfigError::Invalid {
                var: "GRAPH_DB_USER",
                reason: "GRAPH_DB_USER and GRAPH_DB_PASSWORD must be set together".to_string(),
            });
        }

        Ok(Self {
            url: required("GRAPH_DB_URL")?,
            username,
            password,
            namespace: optional("GRAPH_DB_NAMESPACE").unwrap_or_else(|| "dora".to_string()),
            database: optional("GRAPH_DB_NAME").unwrap_or_else(|| "graph".to_string()),
        })
    }
}

/// Analyzer-worker knobs.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub github_token: Option<String>,
    pub mirror_dir: PathBuf,
    pub file_parallelism: usize,
    pub shutdown_grace_secs: u64,
}

impl WorkerSettings {
    pub fn from_env() -> Result<Self> {
        let file_parallelism: usize = parsed_or("FILE_PARALLELISM", 8)?;
        if file_parallelism == 0 {
            return Err(ConfigError::Invalid {
                var: "FILE_PARALLELISM",
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            github_token: optional("GITHUB_TOKEN"),
            mirror_dir: optional("MIRROR_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./.dora-mirrors")),
            file_parallelism,
            shutdown_grace_secs: parsed_or("SHUTDOWN_GRACE_SECS", 10)?,
        })
    }
}

/// Ingress HTTP settings.
#[derive(Debug, Clone)]
pub struct IngestSettings {
    pub secret: String,
    pub addr: SocketAddr,
}

impl IngestSettings {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            secret: required("INGESTER_SECRET")?,
            addr: parsed_or("INGEST_ADDR", SocketAddr::from(([0, 0, 0, 0], 4100)))?,
        })
    }
}

/// Graph-service HTTP settings.
#[derive(Debug, Clone)]
pub struct GraphServiceSettings {
    pub addr: SocketAddr,
}

impl GraphServiceSettings {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            addr: parsed_or("GRAPH_SERVICE_ADDR", SocketAddr::from(([0, 0, 0, 0], 4200)))?,
        })
    }
}
