//! File nodes.

use serde::{Deserialize, Serialize};

use crate::RepoName;

/// A source file tracked inside a single repository.
///
/// Identity is the pair `(repo, path)`; `name` is the basename, stored
/// redundantly for display surfaces that only show leaf names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileNode {
    pub repo: RepoName,
    /// Repository-relative path, forward slashes.
    pub path: String,
    /// Basename of `path`.
    pub name: String,
}

impl FileNode {
    /// Create a node, deriving `name` from the path.
    pub fn new(repo: RepoName, path: impl Into<String>) -> Self {
        let path = path.into();
        let name = basename(&path).to_string();
        Self { repo, path, name }
    }
}

/// Last path segment of a repository-relative path.
pub fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
