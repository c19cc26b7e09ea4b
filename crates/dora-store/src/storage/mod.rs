//! SurrealDB-backed storage.

mod ops;
mod schema;

use surrealdb::engine::any::{connect, Any};
use surrealdb::opt::auth::Root;
use surrealdb::Surreal;

use dora_graph::{Result, StoreError};

/// Connection settings for the graph database.
#[derive(Debug, Clone)]
pub struct SurrealConfig {
    /// `mem://`, `rocksdb://<path>`, or `ws://<host>:<port>`.
    pub url: String,
    /// Root credentials; required by remote engines, ignored by embedded
    /// ones.
    pub username: Option<String>,
    pub password: Option<String>,
    pub namespace: String,
    pub database: String,
}

impl SurrealConfig {
    /// Ephemeral in-memory database (tests, `dora check`).
    pub fn memory() -> Self {
        Self {
            url: "mem://".to_string(),
            username: None,
            password: None,
            namespace: "dora".to_string(),
            database: "graph".to_string(),
        }
    }
}

/// Durable [`GraphStore`](dora_graph::GraphStore) over SurrealDB.
///
/// Files are stored under deterministic record ids built from the composite
/// identity (`file:[repo, path]`), which makes every upsert naturally
/// idempotent; `IMPORTS` edges are `RELATE` records in the `imports`
/// relation table.
#[derive(Debug, Clone)]
pub struct SurrealGraphStore {
    db: Surreal<Any>,
}

impl SurrealGraphStore {
    /// Connect, authenticate if credentials are configured, and select the
    /// namespace/database. Constraints are NOT created here; call
    /// [`ensure_constraints`](dora_graph::GraphStore::ensure_constraints)
    /// once at startup.
    pub async fn connect(config: &SurrealConfig) -> Result<Self> {
        let db = connect(config.url.as_str())
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            db.signin(Root {
                username: username.as_str(),
                password: password.as_str(),
            })
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        }

        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        Ok(Self { db })
    }

    pub(crate) fn db(&self) -> &Surreal<Any> {
        &self.db
    }
}

/// Map an engine error to the store taxonomy.
///
/// SurrealDB reports uniqueness violations as index errors in the message;
/// transport problems mention the connection. Everything else is a plain
/// query failure.
pub(crate) fn classify(err: surrealdb::Error) -> StoreError {
    let msg = err.to_string();
    let lower = msg.to_lowercase();
    if lower.contains("index") && lower.contains("already contains") {
        StoreError::Constraint(msg)
    } else if lower.contains("connection") || lower.contains("websocket") {
        StoreError::Unavailable(msg)
    } else {
        StoreError::Query(msg)
    }
}
