//! The graph store contract.

use async_trait::async_trait;
use thiserror::Error;

use crate::{FileNode, ImportEdge, RepoName};

pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors surfaced by graph-store implementations.
///
/// Mutations are single transactions: on error the stored state is
/// unchanged.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The storage engine could not be reached.
    #[error("graph store unavailable: {0}")]
    Unavailable(String),

    /// A uniqueness constraint rejected the write.
    #[error("constraint conflict: {0}")]
    Constraint(String),

    /// The engine answered, but with an error or an unreadable response.
    #[error("graph query failed: {0}")]
    Query(String),
}

/// Everything stored for one repository.
#[derive(Debug, Clone, Default)]
pub struct RepoGraph {
    pub files: Vec<FileNode>,
    pub edges: Vec<ImportEdge>,
}

/// Durable storage and query for per-repository import graphs.
///
/// This is the only seam through which the pipeline touches persisted graph
/// state. Two properties carry the whole design:
///
/// - **Idempotence.** The queue redelivers; every mutation applied twice
///   must equal the mutation applied once.
/// - **Cycle tolerance.** [`recursive_dependents`] must terminate and
///   return each file at most once even when the subgraph contains cycles.
///
/// [`recursive_dependents`]: GraphStore::recursive_dependents
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Create uniqueness constraints, migrating away from any legacy
    /// single-property constraint first. Safe to call repeatedly; run at
    /// startup.
    async fn ensure_constraints(&self) -> Result<()>;

    /// True if any state at all exists for `repo`.
    async fn repo_exists(&self, repo: &RepoName) -> Result<bool>;

    /// The commit the stored graph reflects, or `None` for an unknown repo.
    async fn last_analyzed_sha(&self, repo: &RepoName) -> Result<Option<String>>;

    /// Upsert the repository record with the given commit.
    async fn set_last_analyzed_sha(&self, repo: &RepoName, sha: &str) -> Result<()>;

    /// Create the file if missing, else update its display name. Edges are
    /// not disturbed.
    async fn upsert_file(&self, repo: &RepoName, path: &str, name: &str) -> Result<()>;

    /// Remove the file and every edge incident to it in one transaction.
    /// A missing file is success.
    async fn delete_file(&self, repo: &RepoName, path: &str) -> Result<()>;

    /// Ensure both endpoints exist and exactly one `IMPORTS` edge runs from
    /// `from_path` to `to_path`, all in one transaction. The target gets
    /// upsert-file semantics; the source is created if absent so a racing
    /// delete cannot leave an orphan edge.
    async fn upsert_edge(
        &self,
        repo: &RepoName,
        from_path: &str,
        to_path: &str,
        to_name: &str,
    ) -> Result<()>;

    /// Remove all outgoing edges of a file, keeping the node.
    async fn delete_outgoing_edges(&self, repo: &RepoName, path: &str) -> Result<()>;

    /// Files `path` imports, one hop.
    async fn dependencies(&self, repo: &RepoName, path: &str) -> Result<Vec<FileNode>>;

    /// Files importing `path`, one hop.
    async fn dependents(&self, repo: &RepoName, path: &str) -> Result<Vec<FileNode>>;

    /// All files reachable by following `IMPORTS` edges backwards one or
    /// more hops from `path`. Deduplicated, cycle-safe, excludes `path`
    /// itself. Sorted by path for stable output.
    async fn recursive_dependents(&self, repo: &RepoName, path: &str) -> Result<Vec<FileNode>>;

    /// All nodes and edges stored for `repo`.
    async fn full_graph(&self, repo: &RepoName) -> Result<RepoGraph>;
}
