//! Source access: the forge, the local mirror, diffs and checkouts.

mod diff;
mod git;
mod github;

pub use diff::{parse_name_status, DiffEntry, DiffStatus};
pub use git::GitSourceProvider;
pub use github::GitHubClient;

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use dora_graph::RepoName;

#[derive(Debug, Error)]
pub enum SourceError {
    /// The forge could not answer a commit lookup.
    #[error("forge request failed: {0}")]
    Forge(String),

    /// A git subprocess failed.
    #[error("git {command} failed: {message}")]
    Git { command: String, message: String },

    /// Incremental analysis was asked for a repo with no local mirror.
    #[error("no local mirror at {0}")]
    MirrorMissing(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Access to a repository's remote state and local working tree.
///
/// One provider instance serves one worker; its mirror cache is not shared
/// across workers, so a job may assume exclusive use of its repo directory.
#[async_trait]
pub trait SourceProvider: Send + Sync {
    /// Head commit of the default branch, from the forge.
    async fn latest_sha(&self, repo: &RepoName) -> Result<String, SourceError>;

    /// True if a usable mirror of `repo` exists locally.
    async fn has_mirror(&self, repo: &RepoName) -> bool;

    /// Create a shallow (depth-1) mirror. An existing mirror is refreshed
    /// instead, which keeps redelivered first-analysis jobs cheap.
    async fn shallow_clone(&self, repo: &RepoName, url: &str) -> Result<(), SourceError>;

    /// Fetch the remote into the mirror.
    async fn fetch(&self, repo: &RepoName) -> Result<(), SourceError>;

    /// Name-status diff between two commits.
    async fn diff(&self, repo: &RepoName, old: &str, new: &str)
        -> Result<Vec<DiffEntry>, SourceError>;

    /// Check out `sha` so the extractor reads that tree.
    async fn checkout(&self, repo: &RepoName, sha: &str) -> Result<(), SourceError>;

    /// Deepen a shallow mirror to full history. Callers fire and forget;
    /// failure only costs future diff depth, not correctness.
    async fn deepen(&self, repo: &RepoName) -> Result<(), SourceError>;

    /// The mirror's working-tree directory for `repo`.
    fn workdir(&self, repo: &RepoName) -> PathBuf;
}
