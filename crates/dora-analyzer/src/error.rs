//! Analyzer error taxonomy.

use thiserror::Error;

use crate::{ExtractError, SourceError};
use dora_graph::StoreError;

/// Anything that can sink a job between `Received` and `Publishing`.
///
/// None of these escape the worker: each becomes a published `failure`
/// result with a public message, and the job is acknowledged.
#[derive(Debug, Error)]
pub enum AnalyzeError {
    /// Malformed job input (bad repository URL).
    #[error("invalid job input: {0}")]
    Input(String),

    /// Forge or git failure.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Graph store failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Extractor could not read a file at all.
    #[error(transparent)]
    Extract(#[from] ExtractError),
}

impl AnalyzeError {
    /// Message safe to put on the dispatch stream. Internal detail (paths,
    /// connection strings, stderr) stays in the logs.
    pub fn public_message(&self) -> String {
        match self {
            Self::Input(msg) => format!("invalid job input: {msg}"),
            Self::Source(SourceError::Forge(_)) => "forge unavailable".to_string(),
            Self::Source(SourceError::MirrorMissing(_)) => "local mirror missing".to_string(),
            Self::Source(_) => "repository access failed".to_string(),
            Self::Store(_) => "graph store unavailable".to_string(),
            Self::Extract(_) => "source analysis failed".to_string(),
        }
    }
}
