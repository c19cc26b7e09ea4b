//! End-to-end analyzer scenarios against the in-memory store, a scripted
//! source provider, and the real import scanner over a temp working tree.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use tempfile::TempDir;

use dora_analyzer::{
    Analyzer, DiffEntry, DiffStatus, EsImportScanner, SourceError, SourceProvider, Worker,
};
use dora_graph::{GraphStore, MemoryGraphStore, RepoName};
use dora_queue::{AnalysisJob, JobQueue, JobStatus, MemoryJobQueue};

const REPO_URL: &str = "https://github.com/acme/widget";

/// Scripted source provider: the "remote" is a plain directory the test
/// writes into, commits are labels, and diffs are preset tables.
struct ScriptedSource {
    tree: PathBuf,
    remote_sha: Mutex<String>,
    diffs: Mutex<HashMap<(String, String), Vec<DiffEntry>>>,
    mirrored: AtomicBool,
    deepen_calls: AtomicUsize,
}

impl ScriptedSource {
    fn new(tree: PathBuf, sha: &str) -> Self {
        Self {
            tree,
            remote_sha: Mutex::new(sha.to_string()),
            diffs: Mutex::new(HashMap::new()),
            mirrored: AtomicBool::new(false),
            deepen_calls: AtomicUsize::new(0),
        }
    }

    fn advance(&self, sha: &str) {
        *self.remote_sha.lock() = sha.to_string();
    }

    fn script_diff(&self, old: &str, new: &str, entries: Vec<DiffEntry>) {
        self.diffs
            .lock()
            .insert((old.to_string(), new.to_string()), entries);
    }
}

#[async_trait]
impl SourceProvider for ScriptedSource {
    async fn latest_sha(&self, _repo: &RepoName) -> Result<String, SourceError> {
        Ok(self.remote_sha.lock().clone())
    }

    async fn has_mirror(&self, _repo: &RepoName) -> bool {
        self.mirrored.load(Ordering::SeqCst)
    }

    async fn shallow_clone(&self, _repo: &RepoName, _url: &str) -> Result<(), SourceError> {
        self.mirrored.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn fetch(&self, _repo: &RepoName) -> Result<(), SourceError> {
        Ok(())
    }

    async fn diff(
        &self,
        _repo: &RepoName,
        old: &str,
        new: &str,
    ) -> Result<Vec<DiffEntry>, SourceError> {
        self.diffs
            .lock()
            .get(&(old.to_string(), new.to_string()))
            .cloned()
            .ok_or_else(|| SourceError::Git {
                command: "diff".to_string(),
                message: format!("no scripted diff {old}..{new}"),
            })
    }

    async fn checkout(&self, _repo: &RepoName, _sha: &str) -> Result<(), SourceError> {
        Ok(())
    }

    async fn deepen(&self, _repo: &RepoName) -> Result<(), SourceError> {
        self.deepen_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn workdir(&self, _repo: &RepoName) -> PathBuf {
        self.tree.clone()
    }
}

struct Harness {
    _tmp: TempDir,
    tree: PathBuf,
    store: MemoryGraphStore,
    source: Arc<ScriptedSource>,
    analyzer: Analyzer,
    repo: RepoName,
}

impl Harness {
    fn new(initial_sha: &str) -> Self {
        let tmp = TempDir::new().unwrap();
        let tree = tmp.path().to_path_buf();
        let store = MemoryGraphStore::new();
        let source = Arc::new(ScriptedSource::new(tree.clone(), initial_sha));
        let analyzer = Analyzer::new(
            Arc::new(store.clone()),
            source.clone(),
            Arc::new(EsImportScanner::new()),
            4,
        );
        Self {
            _tmp: tmp,
            tree,
            store,
            source,
            analyzer,
            repo: "acme/widget".parse().unwrap(),
        }
    }

    fn write(&self, rel: &str, content: &str) {
        let path = self.tree.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    fn remove(&self, rel: &str) {
        fs::remove_file(self.tree.join(rel)).unwrap();
    }

    fn job(&self, sha: &str) -> AnalysisJob {
        AnalysisJob {
            repo_url: REPO_URL.to_string(),
            sha: sha.to_string(),
            event: "push".to_string(),
            pr_number: None,
            received_at: Utc::now(),
        }
    }

    async fn edge_set(&self) -> Vec<(String, String)> {
        let graph = self.store.full_graph(&self.repo).await.unwrap();
        graph
            .edges
            .into_iter()
            .map(|e| (e.from, e.to))
            .collect()
    }
}

fn added(path: &str) -> DiffEntry {
    DiffEntry {
        status: DiffStatus::Added,
        path: path.to_string(),
    }
}

fn modified(path: &str) -> DiffEntry {
    DiffEntry {
        status: DiffStatus::Modified,
        path: path.to_string(),
    }
}

fn deleted(path: &str) -> DiffEntry {
    DiffEntry {
        status: DiffStatus::Deleted,
        path: path.to_string(),
    }
}

#[tokio::test]
async fn first_analysis_builds_graph_from_scratch() {
    let h = Harness::new("X");
    h.write("a.ts", "import { b } from './b';\n");
    h.write("b.ts", "export const b = 1;\n");

    let result = h.analyzer.process(&h.job("X")).await;

    assert_eq!(result.status, JobStatus::Success);
    assert!(result.affected_files.is_empty(), "no baseline to diff");

    assert!(h.store.get_file(&h.repo, "a.ts").is_some());
    assert!(h.store.get_file(&h.repo, "b.ts").is_some());
    assert_eq!(h.edge_set().await, vec![("a.ts".to_string(), "b.ts".to_string())]);
    assert_eq!(
        h.store.last_analyzed_sha(&h.repo).await.unwrap().as_deref(),
        Some("X")
    );

    // Deepen fires in the background after a first analysis.
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    assert_eq!(h.source.deepen_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unchanged_remote_publishes_no_change() {
    let h = Harness::new("X");
    h.write("a.ts", "import { b } from './b';\n");
    h.write("b.ts", "");

    let first = h.analyzer.process(&h.job("X")).await;
    assert_eq!(first.status, JobStatus::Success);
    let files_before = h.store.file_count();

    let second = h.analyzer.process(&h.job("X")).await;
    assert_eq!(second.status, JobStatus::NoChange);
    assert!(second.affected_files.is_empty());
    assert_eq!(h.store.file_count(), files_before);
}

#[tokio::test]
async fn incremental_add_and_modify() {
    let h = Harness::new("X");
    h.write("a.ts", "import { b } from './b';\n");
    h.write("b.ts", "");
    assert_eq!(h.analyzer.process(&h.job("X")).await.status, JobStatus::Success);

    // Remote advances: a.ts also imports c, new c.ts imports b.
    h.write("a.ts", "import { b } from './b';\nimport { c } from './c';\n");
    h.write("c.ts", "import { b } from './b';\n");
    h.source.advance("Y");
    h.source
        .script_diff("X", "Y", vec![added("c.ts"), modified("a.ts")]);

    let result = h.analyzer.process(&h.job("Y")).await;

    assert_eq!(result.status, JobStatus::Success);
    assert_eq!(result.affected_files, vec!["a.ts", "c.ts"]);

    let mut edges = h.edge_set().await;
    edges.sort();
    assert_eq!(
        edges,
        vec![
            ("a.ts".to_string(), "b.ts".to_string()),
            ("a.ts".to_string(), "c.ts".to_string()),
            ("c.ts".to_string(), "b.ts".to_string()),
        ]
    );
    assert_eq!(
        h.store.last_analyzed_sha(&h.repo).await.unwrap().as_deref(),
        Some("Y")
    );
}

#[tokio::test]
async fn incremental_delete_removes_file_and_edges() {
    let h = Harness::new("X");
    h.write("a.ts", "import { b } from './b';\nimport { c } from './c';\n");
    h.write("b.ts", "");
    h.write("c.ts", "import { b } from './b';\n");
    assert_eq!(h.analyzer.process(&h.job("X")).await.status, JobStatus::Success);

    h.remove("c.ts");
    h.write("a.ts", "import { b } from './b';\n");
    h.source.advance("Z");
    h.source
        .script_diff("X", "Z", vec![deleted("c.ts"), modified("a.ts")]);

    let result = h.analyzer.process(&h.job("Z")).await;

    assert_eq!(result.status, JobStatus::Success);
    assert!(result.affected_files.contains(&"a.ts".to_string()));
    assert!(h.store.get_file(&h.repo, "c.ts").is_none());
    assert_eq!(h.edge_set().await, vec![("a.ts".to_string(), "b.ts".to_string())]);
}

#[tokio::test]
async fn non_source_changes_are_ignored_by_incremental_update() {
    let h = Harness::new("X");
    h.write("a.ts", "import { b } from './b';\n");
    h.write("b.ts", "");
    assert_eq!(h.analyzer.process(&h.job("X")).await.status, JobStatus::Success);

    // The commit touches a binary, docs, and one real source file.
    std::fs::write(h.tree.join("logo.png"), [0x89, 0x50, 0x4e, 0x47]).unwrap();
    h.write("README.md", "# widget\n");
    h.write("a.ts", "import { b } from './b';\nexport const a = 1;\n");
    h.source.advance("Y");
    h.source.script_diff(
        "X",
        "Y",
        vec![added("logo.png"), modified("README.md"), modified("a.ts")],
    );

    let result = h.analyzer.process(&h.job("Y")).await;

    assert_eq!(result.status, JobStatus::Success);
    assert_eq!(result.affected_files, vec!["a.ts"]);

    // Neither the binary nor the docs became graph nodes.
    assert_eq!(h.store.file_count(), 2);
    assert!(h.store.get_file(&h.repo, "logo.png").is_none());
    assert!(h.store.get_file(&h.repo, "README.md").is_none());
    assert_eq!(
        h.store.last_analyzed_sha(&h.repo).await.unwrap().as_deref(),
        Some("Y")
    );
}

#[tokio::test]
async fn blast_radius_includes_transitive_dependents() {
    let h = Harness::new("X");
    // chain: app → feature → util
    h.write("util.ts", "export const u = 1;\n");
    h.write("feature.ts", "import { u } from './util';\nexport const f = u;\n");
    h.write("app.ts", "import { f } from './feature';\n");
    assert_eq!(h.analyzer.process(&h.job("X")).await.status, JobStatus::Success);

    h.write("util.ts", "export const u = 2;\n");
    h.source.advance("Y");
    h.source.script_diff("X", "Y", vec![modified("util.ts")]);

    let result = h.analyzer.process(&h.job("Y")).await;

    assert_eq!(result.status, JobStatus::Success);
    assert_eq!(result.affected_files, vec!["app.ts", "feature.ts", "util.ts"]);
}

#[tokio::test]
async fn mutual_imports_terminate() {
    let h = Harness::new("X");
    h.write("a.ts", "import { b } from './b';\nexport const a = 1;\n");
    h.write("b.ts", "import { a } from './a';\nexport const b = 1;\n");

    assert_eq!(h.analyzer.process(&h.job("X")).await.status, JobStatus::Success);

    let dependents = h.store.recursive_dependents(&h.repo, "a.ts").await.unwrap();
    let paths: Vec<_> = dependents.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, vec!["b.ts"]);
}

#[tokio::test]
async fn incremental_converges_with_full_analysis() {
    // Incremental from X to Y...
    let inc = Harness::new("X");
    inc.write("a.ts", "import { b } from './b';\n");
    inc.write("b.ts", "");
    assert_eq!(inc.analyzer.process(&inc.job("X")).await.status, JobStatus::Success);

    inc.write("a.ts", "import { c } from './c';\n");
    inc.write("c.ts", "import { b } from './b';\n");
    inc.source.advance("Y");
    inc.source
        .script_diff("X", "Y", vec![added("c.ts"), modified("a.ts")]);
    assert_eq!(inc.analyzer.process(&inc.job("Y")).await.status, JobStatus::Success);

    // ...must equal a fresh full analysis at Y.
    let full = Harness::new("Y");
    full.write("a.ts", "import { c } from './c';\n");
    full.write("b.ts", "");
    full.write("c.ts", "import { b } from './b';\n");
    assert_eq!(full.analyzer.process(&full.job("Y")).await.status, JobStatus::Success);

    let inc_graph = inc.store.full_graph(&inc.repo).await.unwrap();
    let full_graph = full.store.full_graph(&full.repo).await.unwrap();

    let inc_files: Vec<_> = inc_graph.files.iter().map(|f| f.path.clone()).collect();
    let full_files: Vec<_> = full_graph.files.iter().map(|f| f.path.clone()).collect();
    assert_eq!(inc_files, full_files);
    assert_eq!(inc_graph.edges, full_graph.edges);
}

#[tokio::test]
async fn malformed_url_publishes_failure() {
    let h = Harness::new("X");
    let mut job = h.job("X");
    job.repo_url = "not a url".to_string();

    let result = h.analyzer.process(&job).await;
    assert_eq!(result.status, JobStatus::Failure);
    assert!(result.error.is_some());
    assert!(result.affected_files.is_empty());
}

#[tokio::test]
async fn missing_mirror_fails_incremental() {
    let h = Harness::new("Y");
    // A previous analysis is on record, but this worker has no mirror.
    h.store.set_last_analyzed_sha(&h.repo, "X").await.unwrap();

    let result = h.analyzer.process(&h.job("Y")).await;
    assert_eq!(result.status, JobStatus::Failure);
    assert_eq!(result.error.as_deref(), Some("local mirror missing"));
}

#[tokio::test]
async fn redelivered_job_is_idempotent() {
    let h = Harness::new("X");
    h.write("a.ts", "import { b } from './b';\n");
    h.write("b.ts", "");

    let queue = Arc::new(MemoryJobQueue::new());
    queue.publish_analysis(&h.job("X")).await.unwrap();

    // First delivery is consumed but never acked (worker "crashed").
    let first = queue.next_job().await.unwrap();
    let first_result = h.analyzer.process(&first.job).await;
    queue.publish_dispatch(&first_result).await.unwrap();
    queue.redeliver_pending();

    // Second delivery of the same message.
    let second = queue.next_job().await.unwrap();
    assert_eq!(first.id, second.id);
    let second_result = h.analyzer.process(&second.job).await;
    queue.publish_dispatch(&second_result).await.unwrap();
    queue.ack(&second.id).await.unwrap();

    let dispatched = queue.dispatched();
    assert_eq!(dispatched.len(), 2);
    assert_eq!(dispatched[0].affected_files, dispatched[1].affected_files);
    assert_eq!(dispatched[0].repo_name, dispatched[1].repo_name);

    // Store state equals a single delivery's.
    assert_eq!(h.store.file_count(), 2);
    assert_eq!(h.edge_set().await, vec![("a.ts".to_string(), "b.ts".to_string())]);
}

#[tokio::test]
async fn worker_processes_publishes_and_acks() {
    let h = Harness::new("X");
    h.write("a.ts", "import { b } from './b';\n");
    h.write("b.ts", "");

    let queue = Arc::new(MemoryJobQueue::new());
    queue.publish_analysis(&h.job("X")).await.unwrap();
    queue.close();

    let worker = Worker::new(queue.clone(), h.analyzer);
    let (_tx, rx) = tokio::sync::watch::channel(false);
    worker.run(rx).await;

    let dispatched = queue.dispatched();
    assert_eq!(dispatched.len(), 1);
    assert_eq!(dispatched[0].status, JobStatus::Success);
    assert_eq!(dispatched[0].repo_name, "acme/widget");
    assert!(queue.pending_ids().is_empty(), "job was acked after publish");
}
