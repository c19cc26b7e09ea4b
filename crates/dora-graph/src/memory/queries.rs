//! Read methods for the in-memory store.

use rustc_hash::FxHashSet;

use crate::{FileNode, ImportEdge, RepoGraph, RepoName};

use super::graph::{GraphInner, MemoryGraphStore};

impl MemoryGraphStore {
    pub(super) fn repo_exists_sync(&self, repo: &RepoName) -> bool {
        let inner = self.inner.read();
        inner.repos.contains_key(repo)
            || inner.files.get(repo).is_some_and(|files| !files.is_empty())
    }

    pub(super) fn last_analyzed_sha_sync(&self, repo: &RepoName) -> Option<String> {
        self.inner.read().repos.get(repo).cloned()
    }

    pub(super) fn dependencies_sync(&self, repo: &RepoName, path: &str) -> Vec<FileNode> {
        let inner = self.inner.read();
        let mut out = match inner.dependencies.get(repo).and_then(|m| m.get(path)) {
            Some(targets) => resolve_nodes(&inner, repo, targets.iter()),
            None => Vec::new(),
        };
        out.sort_by(|a, b| a.path.cmp(&b.path));
        out
    }

    pub(super) fn dependents_sync(&self, repo: &RepoName, path: &str) -> Vec<FileNode> {
        let inner = self.inner.read();
        let mut out = match inner.dependents.get(repo).and_then(|m| m.get(path)) {
            Some(sources) => resolve_nodes(&inner, repo, sources.iter()),
            None => Vec::new(),
        };
        out.sort_by(|a, b| a.path.cmp(&b.path));
        out
    }

    /// Reverse reachability with an explicit visited set, so mutually
    /// importing files terminate and appear once.
    pub(super) fn recursive_dependents_sync(&self, repo: &RepoName, path: &str) -> Vec<FileNode> {
        let inner = self.inner.read();
        let Some(dependents) = inner.dependents.get(repo) else {
            return Vec::new();
        };

        let mut visited: FxHashSet<&str> = FxHashSet::default();
        let mut frontier: Vec<&str> = vec![path];
        visited.insert(path);

        while let Some(current) = frontier.pop() {
            if let Some(sources) = dependents.get(current) {
                for source in sources {
                    if visited.insert(source.as_str()) {
                        frontier.push(source);
                    }
                }
            }
        }

        // The start file is seed state, not a result.
        visited.remove(path);

        let mut out = resolve_nodes(&inner, repo, visited.into_iter());
        out.sort_by(|a, b| a.path.cmp(&b.path));
        out
    }

    pub(super) fn full_graph_sync(&self, repo: &RepoName) -> RepoGraph {
        let inner = self.inner.read();

        let mut files: Vec<FileNode> = inner
            .files
            .get(repo)
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default();
        files.sort_by(|a, b| a.path.cmp(&b.path));

        let mut edges: Vec<ImportEdge> = inner
            .dependencies
            .get(repo)
            .map(|adjacency| {
                adjacency
                    .iter()
                    .flat_map(|(from, targets)| {
                        targets
                            .iter()
                            .map(move |to| ImportEdge::new(from.as_str(), to.as_str()))
                    })
                    .collect()
            })
            .unwrap_or_default();
        edges.sort();

        RepoGraph { files, edges }
    }
}

fn resolve_nodes<'a, S, I>(inner: &GraphInner, repo: &RepoName, paths: I) -> Vec<FileNode>
where
    S: AsRef<str> + ?Sized + 'a,
    I: Iterator<Item = &'a S>,
{
    let Some(files) = inner.files.get(repo) else {
        return Vec::new();
    };
    paths
        .filter_map(|p| files.get(p.as_ref()).cloned())
        .collect()
}
