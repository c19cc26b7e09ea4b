//! Core storage for the in-memory store.

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::{FileNode, RepoName};

/// Adjacency keyed by file path, one map per repository.
pub(super) type PathSet = FxHashSet<String>;

#[derive(Default)]
pub(super) struct GraphInner {
    /// `(repo → path → node)`; the nested map is the identity constraint.
    pub files: FxHashMap<RepoName, FxHashMap<String, FileNode>>,
    /// Forward edges: `from` imports members of the set.
    pub dependencies: FxHashMap<RepoName, FxHashMap<String, PathSet>>,
    /// Reverse edges, kept symmetric with `dependencies` on every mutation.
    pub dependents: FxHashMap<RepoName, FxHashMap<String, PathSet>>,
    /// Last analyzed commit per repository.
    pub repos: FxHashMap<RepoName, String>,
}

/// In-memory [`GraphStore`](crate::GraphStore) implementation.
///
/// Cheap to clone; all clones share the same graph.
#[derive(Clone, Default)]
pub struct MemoryGraphStore {
    pub(super) inner: Arc<RwLock<GraphInner>>,
}

impl MemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look a node up by its composite identity.
    pub fn get_file(&self, repo: &RepoName, path: &str) -> Option<FileNode> {
        self.inner
            .read()
            .files
            .get(repo)
            .and_then(|m| m.get(path))
            .cloned()
    }

    /// Total node count across all repositories (test helper).
    pub fn file_count(&self) -> usize {
        self.inner.read().files.values().map(|m| m.len()).sum()
    }
}
