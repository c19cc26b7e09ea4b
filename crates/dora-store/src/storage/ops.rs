//! `GraphStore` operations on SurrealDB.
//!
//! Every mutation is one query round-trip wrapped in a transaction where it
//! touches more than one record. Record ids are deterministic
//! (`file:[repo, path]`), so UPSERT statements are the identity-race
//! arbiter rather than application-side read-modify-write.

use async_trait::async_trait;
use rustc_hash::FxHashSet;
use serde::Deserialize;
use serde_json::json;

use dora_graph::{FileNode, GraphStore, ImportEdge, RepoGraph, RepoName, Result, StoreError};

use super::{classify, SurrealGraphStore};

#[derive(Debug, Deserialize)]
struct FileRecord {
    repo: String,
    path: String,
    name: String,
}

impl FileRecord {
    fn into_node(self) -> Result<FileNode> {
        let repo: RepoName = self
            .repo
            .parse()
            .map_err(|_| StoreError::Query(format!("malformed repo name in store: {}", self.repo)))?;
        Ok(FileNode {
            repo,
            path: self.path,
            name: self.name,
        })
    }
}

#[derive(Debug, Deserialize)]
struct EdgeRecord {
    from: String,
    to: String,
}

/// Direction of a one-hop traversal over the `imports` relation.
#[derive(Clone, Copy)]
enum Hop {
    /// `path` imports the result set.
    Forward,
    /// The result set imports `path`.
    Reverse,
}

impl SurrealGraphStore {
    async fn one_hop(&self, repo: &RepoName, path: &str, hop: Hop) -> Result<Vec<FileNode>> {
        // Query the edge table directly: one row per edge keeps the
        // response shape flat regardless of fan-out.
        let query = match hop {
            Hop::Forward => {
                "SELECT VALUE out.* FROM imports WHERE in = type::thing('file', [$repo, $path]);"
            }
            Hop::Reverse => {
                "SELECT VALUE in.* FROM imports WHERE out = type::thing('file', [$repo, $path]);"
            }
        };

        let mut response = self
            .db()
            .query(query)
            .bind(json!({ "repo": repo.as_str(), "path": path }))
            .await
            .map_err(classify)?;

        let records: Vec<FileRecord> = response.take(0).map_err(classify)?;
        let mut nodes = records
            .into_iter()
            .map(FileRecord::into_node)
            .collect::<Result<Vec<_>>>()?;
        nodes.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(nodes)
    }
}

#[async_trait]
impl GraphStore for SurrealGraphStore {
    async fn ensure_constraints(&self) -> Result<()> {
        self.define_schema().await
    }

    async fn repo_exists(&self, repo: &RepoName) -> Result<bool> {
        let mut response = self
            .db()
            .query("SELECT VALUE name FROM type::thing('repository', $repo);")
            .query("SELECT VALUE path FROM file WHERE repo = $repo LIMIT 1;")
            .bind(json!({ "repo": repo.as_str() }))
            .await
            .map_err(classify)?;

        let known: Option<String> = response.take(0).map_err(classify)?;
        let files: Vec<String> = response.take(1).map_err(classify)?;
        Ok(known.is_some() || !files.is_empty())
    }

    async fn last_analyzed_sha(&self, repo: &RepoName) -> Result<Option<String>> {
        let mut response = self
            .db()
            .query("SELECT VALUE last_analyzed_sha FROM type::thing('repository', $repo);")
            .bind(json!({ "repo": repo.as_str() }))
            .await
            .map_err(classify)?;

        let sha: Option<String> = response.take(0).map_err(classify)?;
        Ok(sha)
    }

    async fn set_last_analyzed_sha(&self, repo: &RepoName, sha: &str) -> Result<()> {
        self.db()
            .query("UPSERT type::thing('repository', $repo) SET name = $repo, last_analyzed_sha = $sha;")
            .bind(json!({ "repo": repo.as_str(), "sha": sha }))
            .await
            .map_err(classify)?
            .check()
            .map_err(classify)?;
        Ok(())
    }

    async fn upsert_file(&self, repo: &RepoName, path: &str, name: &str) -> Result<()> {
        self.db()
            .query("UPSERT type::thing('file', [$repo, $path]) SET repo = $repo, path = $path, name = $name;")
            .bind(json!({ "repo": repo.as_str(), "path": path, "name": name }))
            .await
            .map_err(classify)?
            .check()
            .map_err(classify)?;
        Ok(())
    }

    async fn delete_file(&self, repo: &RepoName, path: &str) -> Result<()> {
        let query = r#"
            BEGIN TRANSACTION;
            LET $node = type::thing('file', [$repo, $path]);
            DELETE $node->imports;
            DELETE $node<-imports;
            DELETE $node;
            COMMIT TRANSACTION;
        "#;
        self.db()
            .query(query)
            .bind(json!({ "repo": repo.as_str(), "path": path }))
            .await
            .map_err(classify)?
            .check()
            .map_err(classify)?;
        Ok(())
    }

    async fn upsert_edge(
        &self,
        repo: &RepoName,
        from_path: &str,
        to_path: &str,
        to_name: &str,
    ) -> Result<()> {
        // Both endpoints are ensured inside the transaction so a racing
        // delete of the source cannot strand the new edge, and the
        // existence check keeps RELATE from minting duplicate edges.
        let query = r#"
            BEGIN TRANSACTION;
            LET $src = type::thing('file', [$repo, $from_path]);
            LET $dst = type::thing('file', [$repo, $to_path]);
            UPSERT $dst SET repo = $repo, path = $to_path, name = $to_name;
            UPSERT $src SET repo = $repo, path = $from_path, name = $from_name;
            IF array::is_empty((SELECT VALUE id FROM imports WHERE in = $src AND out = $dst)) {
                RELATE $src->imports->$dst;
            };
            COMMIT TRANSACTION;
        "#;
        self.db()
            .query(query)
            .bind(json!({
                "repo": repo.as_str(),
                "from_path": from_path,
                "from_name": dora_graph::basename(from_path),
                "to_path": to_path,
                "to_name": to_name,
            }))
            .await
            .map_err(classify)?
            .check()
            .map_err(classify)?;
        Ok(())
    }

    async fn delete_outgoing_edges(&self, repo: &RepoName, path: &str) -> Result<()> {
        self.db()
            .query("DELETE type::thing('file', [$repo, $path])->imports;")
            .bind(json!({ "repo": repo.as_str(), "path": path }))
            .await
            .map_err(classify)?
            .check()
            .map_err(classify)?;
        Ok(())
    }

    async fn dependencies(&self, repo: &RepoName, path: &str) -> Result<Vec<FileNode>> {
        self.one_hop(repo, path, Hop::Forward).await
    }

    async fn dependents(&self, repo: &RepoName, path: &str) -> Result<Vec<FileNode>> {
        self.one_hop(repo, path, Hop::Reverse).await
    }

    async fn recursive_dependents(&self, repo: &RepoName, path: &str) -> Result<Vec<FileNode>> {
        // Breadth-first over one-hop reverse queries with a visited set;
        // cycles terminate because a path is queried at most once.
        let mut visited: FxHashSet<String> = FxHashSet::default();
        visited.insert(path.to_string());

        let mut frontier: Vec<String> = vec![path.to_string()];
        let mut out: Vec<FileNode> = Vec::new();

        while let Some(current) = frontier.pop() {
            for node in self.one_hop(repo, &current, Hop::Reverse).await? {
                if visited.insert(node.path.clone()) {
                    frontier.push(node.path.clone());
                    out.push(node);
                }
            }
        }

        out.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(out)
    }

    async fn full_graph(&self, repo: &RepoName) -> Result<RepoGraph> {
        let mut response = self
            .db()
            .query("SELECT repo, path, name FROM file WHERE repo = $repo;")
            .query("SELECT VALUE { from: in.path, to: out.path } FROM imports WHERE in.repo = $repo;")
            .bind(json!({ "repo": repo.as_str() }))
            .await
            .map_err(classify)?;

        let file_records: Vec<FileRecord> = response.take(0).map_err(classify)?;
        let edge_records: Vec<EdgeRecord> = response.take(1).map_err(classify)?;

        let mut files = file_records
            .into_iter()
            .map(FileRecord::into_node)
            .collect::<Result<Vec<_>>>()?;
        files.sort_by(|a, b| a.path.cmp(&b.path));

        let mut edges: Vec<ImportEdge> = edge_records
            .into_iter()
            .map(|e| ImportEdge::new(e.from, e.to))
            .collect();
        edges.sort();

        Ok(RepoGraph { files, edges })
    }
}

#[cfg(test)]
mod tests {
    use super::super::{SurrealConfig, SurrealGraphStore};
    use dora_graph::{GraphStore, RepoName};

    async fn store() -> SurrealGraphStore {
        let store = SurrealGraphStore::connect(&SurrealConfig::memory())
            .await
            .expect("in-memory engine connects");
        store.ensure_constraints().await.expect("schema defines");
        store
    }

    fn repo(s: &str) -> RepoName {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn ensure_constraints_is_repeatable() {
        let store = store().await;
        store.ensure_constraints().await.unwrap();
        store.ensure_constraints().await.unwrap();
    }

    #[tokio::test]
    async fn file_upsert_roundtrip() {
        let store = store().await;
        let r = repo("acme/widget");

        store.upsert_file(&r, "src/a.ts", "a.ts").await.unwrap();
        store.upsert_file(&r, "src/a.ts", "a.ts").await.unwrap();

        let graph = store.full_graph(&r).await.unwrap();
        assert_eq!(graph.files.len(), 1);
        assert_eq!(graph.files[0].path, "src/a.ts");
        assert_eq!(graph.files[0].name, "a.ts");
    }

    #[tokio::test]
    async fn edge_upsert_is_idempotent_and_creates_endpoints() {
        let store = store().await;
        let r = repo("acme/widget");

        for _ in 0..2 {
            store
                .upsert_edge(&r, "src/a.ts", "src/b.ts", "b.ts")
                .await
                .unwrap();
        }

        let graph = store.full_graph(&r).await.unwrap();
        assert_eq!(graph.files.len(), 2);
        assert_eq!(graph.edges.len(), 1);

        let deps = store.dependencies(&r, "src/a.ts").await.unwrap();
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].path, "src/b.ts");
    }

    #[tokio::test]
    async fn delete_file_removes_incident_edges() {
        let store = store().await;
        let r = repo("acme/widget");

        store
            .upsert_edge(&r, "src/a.ts", "src/b.ts", "b.ts")
            .await
            .unwrap();
        store
            .upsert_edge(&r, "src/b.ts", "src/c.ts", "c.ts")
            .await
            .unwrap();

        store.delete_file(&r, "src/b.ts").await.unwrap();

        let graph = store.full_graph(&r).await.unwrap();
        assert_eq!(graph.files.len(), 2);
        assert!(graph.edges.is_empty());

        // Deleting again is still success.
        store.delete_file(&r, "src/b.ts").await.unwrap();
    }

    #[tokio::test]
    async fn recursive_dependents_handle_cycles() {
        let store = store().await;
        let r = repo("acme/widget");

        store
            .upsert_edge(&r, "a.ts", "b.ts", "b.ts")
            .await
            .unwrap();
        store
            .upsert_edge(&r, "b.ts", "a.ts", "a.ts")
            .await
            .unwrap();

        let affected = store.recursive_dependents(&r, "a.ts").await.unwrap();
        let paths: Vec<_> = affected.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["b.ts"]);
    }

    #[tokio::test]
    async fn sha_bookkeeping() {
        let store = store().await;
        let r = repo("acme/widget");

        assert!(!store.repo_exists(&r).await.unwrap());
        assert!(store.last_analyzed_sha(&r).await.unwrap().is_none());

        store.set_last_analyzed_sha(&r, "abc").await.unwrap();
        store.set_last_analyzed_sha(&r, "def").await.unwrap();

        assert!(store.repo_exists(&r).await.unwrap());
        assert_eq!(
            store.last_analyzed_sha(&r).await.unwrap().as_deref(),
            Some("def")
        );
    }

    #[tokio::test]
    async fn repos_are_isolated() {
        let store = store().await;
        let r1 = repo("acme/widget");
        let r2 = repo("acme/gadget");

        store
            .upsert_edge(&r1, "a.ts", "b.ts", "b.ts")
            .await
            .unwrap();
        store.upsert_file(&r2, "a.ts", "a.ts").await.unwrap();

        assert_eq!(store.full_graph(&r1).await.unwrap().files.len(), 2);
        assert_eq!(store.full_graph(&r2).await.unwrap().files.len(), 1);
        assert!(store.dependents(&r2, "b.ts").await.unwrap().is_empty());
    }
}
