//! CLI error type and miette conversion.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] dora_config::ConfigError),

    #[error("graph store error: {0}")]
    Store(#[from] dora_graph::StoreError),

    #[error("queue error: {0}")]
    Queue(#[from] dora_queue::QueueError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convert a CLI error into a miette report with a usable hint where one
/// exists.
pub fn cli_error_to_miette(err: CliError) -> miette::Report {
    match &err {
        CliError::Config(_) => miette::miette!(
            "{err}\n\nHint: run 'dora check' to see which variables the services expect"
        ),
        CliError::Store(_) => miette::miette!(
            "{err}\n\nHint: verify GRAPH_DB_URL points at a reachable SurrealDB endpoint"
        ),
        CliError::Queue(_) => {
            miette::miette!("{err}\n\nHint: verify REDIS_URL points at a reachable Redis server")
        }
        CliError::Io(_) => miette::miette!("{err}"),
    }
}
