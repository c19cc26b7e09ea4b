//! Import extraction.

mod scanner;

pub use scanner::EsImportScanner;

use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to walk source tree: {0}")]
    Walk(String),
}

/// Resolves a file's imports to repository-relative paths.
///
/// Implementations are the authority on which files exist in the graph and
/// which edges leave each file. Individual imports that cannot be resolved
/// are skipped (logged, never fatal); imports landing outside the repo root
/// or under excluded subtrees such as `node_modules` are never returned.
pub trait ImportExtractor: Send + Sync {
    /// Whether `path` names a file this extractor would analyze at all:
    /// the same predicate [`list_source_files`] applies while walking.
    /// Change feeds use it so that a binary or vendored file in a diff
    /// never enters the graph.
    ///
    /// [`list_source_files`]: ImportExtractor::list_source_files
    fn is_source_file(&self, path: &str) -> bool;

    /// Repo-relative paths of the in-repo files `file` imports. A file
    /// whose content cannot be scanned yields no imports rather than an
    /// error.
    fn extract(&self, repo_root: &Path, file: &str) -> Result<Vec<String>, ExtractError>;

    /// Every analyzable source file under `repo_root`, repo-relative,
    /// sorted, excluding `node_modules` and hidden directories.
    fn list_source_files(&self, repo_root: &Path) -> Result<Vec<String>, ExtractError>;
}
