//! Mutation methods for the in-memory store.
//!
//! Every method here is idempotent and takes the write lock exactly once,
//! which makes it atomic with respect to concurrent readers.

use crate::{basename, FileNode, RepoName};

use super::graph::MemoryGraphStore;

impl MemoryGraphStore {
    pub(super) fn set_last_analyzed_sha_sync(&self, repo: &RepoName, sha: &str) {
        self.inner
            .write()
            .repos
            .insert(repo.clone(), sha.to_string());
    }

    pub(super) fn upsert_file_sync(&self, repo: &RepoName, path: &str, name: &str) {
        let mut inner = self.inner.write();
        inner
            .files
            .entry(repo.clone())
            .or_default()
            .entry(path.to_string())
            .and_modify(|node| node.name = name.to_string())
            .or_insert_with(|| FileNode {
                repo: repo.clone(),
                path: path.to_string(),
                name: name.to_string(),
            });
    }

    pub(super) fn delete_file_sync(&self, repo: &RepoName, path: &str) {
        let mut inner = self.inner.write();

        if let Some(files) = inner.files.get_mut(repo) {
            files.remove(path);
        }

        // Outgoing edges: drop our adjacency row and our entry in each
        // target's reverse set.
        let targets = inner
            .dependencies
            .get_mut(repo)
            .and_then(|m| m.remove(path))
            .unwrap_or_default();
        if let Some(dependents) = inner.dependents.get_mut(repo) {
            for target in &targets {
                if let Some(set) = dependents.get_mut(target) {
                    set.remove(path);
                }
            }
        }

        // Incoming edges: the mirror image.
        let sources = inner
            .dependents
            .get_mut(repo)
            .and_then(|m| m.remove(path))
            .unwrap_or_default();
        if let Some(dependencies) = inner.dependencies.get_mut(repo) {
            for source in &sources {
                if let Some(set) = dependencies.get_mut(source) {
                    set.remove(path);
                }
            }
        }
    }

    pub(super) fn upsert_edge_sync(
        &self,
        repo: &RepoName,
        from_path: &str,
        to_path: &str,
        to_name: &str,
    ) {
        let mut inner = self.inner.write();

        let files = inner.files.entry(repo.clone()).or_default();

        // Target gets upsert-file semantics; the source only has to exist.
        files
            .entry(to_path.to_string())
            .and_modify(|node| node.name = to_name.to_string())
            .or_insert_with(|| FileNode {
                repo: repo.clone(),
                path: to_path.to_string(),
                name: to_name.to_string(),
            });
        files
            .entry(from_path.to_string())
            .or_insert_with(|| FileNode {
                repo: repo.clone(),
                path: from_path.to_string(),
                name: basename(from_path).to_string(),
            });

        // HashSet insertion keeps the edge unique per ordered pair.
        inner
            .dependencies
            .entry(repo.clone())
            .or_default()
            .entry(from_path.to_string())
            .or_default()
            .insert(to_path.to_string());
        inner
            .dependents
            .entry(repo.clone())
            .or_default()
            .entry(to_path.to_string())
            .or_default()
            .insert(from_path.to_string());
    }

    pub(super) fn delete_outgoing_edges_sync(&self, repo: &RepoName, path: &str) {
        let mut inner = self.inner.write();

        let targets = inner
            .dependencies
            .get_mut(repo)
            .and_then(|m| m.remove(path))
            .unwrap_or_default();
        if let Some(dependents) = inner.dependents.get_mut(repo) {
            for target in &targets {
                if let Some(set) = dependents.get_mut(target) {
                    set.remove(path);
                }
            }
        }
    }
}
