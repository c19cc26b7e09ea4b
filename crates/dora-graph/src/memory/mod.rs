//! In-memory graph store.
//!
//! HashMap-based storage behind a single `RwLock`. Used by tests and by
//! single-process deployments that do not need durability; the durable
//! SurrealDB implementation lives in `dora-store`.

mod graph;
mod mutations;
mod queries;

pub use graph::MemoryGraphStore;

use async_trait::async_trait;

use crate::{FileNode, GraphStore, RepoGraph, RepoName, Result};

#[async_trait]
impl GraphStore for MemoryGraphStore {
    async fn ensure_constraints(&self) -> Result<()> {
        // Identity uniqueness is structural here: files are keyed by
        // (repo, path) maps. Nothing to migrate.
        Ok(())
    }

    async fn repo_exists(&self, repo: &RepoName) -> Result<bool> {
        Ok(self.repo_exists_sync(repo))
    }

    async fn last_analyzed_sha(&self, repo: &RepoName) -> Result<Option<String>> {
        Ok(self.last_analyzed_sha_sync(repo))
    }

    async fn set_last_analyzed_sha(&self, repo: &RepoName, sha: &str) -> Result<()> {
        self.set_last_analyzed_sha_sync(repo, sha);
        Ok(())
    }

    async fn upsert_file(&self, repo: &RepoName, path: &str, name: &str) -> Result<()> {
        self.upsert_file_sync(repo, path, name);
        Ok(())
    }

    async fn delete_file(&self, repo: &RepoName, path: &str) -> Result<()> {
        self.delete_file_sync(repo, path);
        Ok(())
    }

    async fn upsert_edge(
        &self,
        repo: &RepoName,
        from_path: &str,
        to_path: &str,
        to_name: &str,
    ) -> Result<()> {
        self.upsert_edge_sync(repo, from_path, to_path, to_name);
        Ok(())
    }

    async fn delete_outgoing_edges(&self, repo: &RepoName, path: &str) -> Result<()> {
        self.delete_outgoing_edges_sync(repo, path);
        Ok(())
    }

    async fn dependencies(&self, repo: &RepoName, path: &str) -> Result<Vec<FileNode>> {
        Ok(self.dependencies_sync(repo, path))
    }

    async fn dependents(&self, repo: &RepoName, path: &str) -> Result<Vec<FileNode>> {
        Ok(self.dependents_sync(repo, path))
    }

    async fn recursive_dependents(&self, repo: &RepoName, path: &str) -> Result<Vec<FileNode>> {
        Ok(self.recursive_dependents_sync(repo, path))
    }

    async fn full_graph(&self, repo: &RepoName) -> Result<RepoGraph> {
        Ok(self.full_graph_sync(repo))
    }
}
