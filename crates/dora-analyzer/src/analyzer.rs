//! Per-job graph reconciliation and blast-radius computation.

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;

use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, info, warn};

use dora_graph::{basename, GraphStore, RepoName};
use dora_queue::{AnalysisJob, DispatchResult};

use crate::{AnalyzeError, DiffStatus, ImportExtractor, SourceError, SourceProvider};

/// Reconciles one repository's stored graph with its remote head and
/// computes the affected-file set.
///
/// `process` never returns an error: every failure becomes a published
/// `failure` result so the worker can acknowledge the job and move on.
pub struct Analyzer {
    store: Arc<dyn GraphStore>,
    source: Arc<dyn SourceProvider>,
    extractor: Arc<dyn ImportExtractor>,
    file_parallelism: usize,
}

impl Analyzer {
    pub fn new(
        store: Arc<dyn GraphStore>,
        source: Arc<dyn SourceProvider>,
        extractor: Arc<dyn ImportExtractor>,
        file_parallelism: usize,
    ) -> Self {
        Self {
            store,
            source,
            extractor,
            file_parallelism: file_parallelism.max(1),
        }
    }

    /// Run one job to a dispatchable outcome.
    pub async fn process(&self, job: &AnalysisJob) -> DispatchResult {
        let repo = match RepoName::from_remote_url(&job.repo_url) {
            Ok(repo) => repo,
            Err(e) => {
                warn!(url = %job.repo_url, error = %e, "rejecting job with bad repository URL");
                let err = AnalyzeError::Input("bad repository URL".to_string());
                return DispatchResult::failure(
                    job.repo_url.clone(),
                    job.sha.clone(),
                    err.public_message(),
                );
            }
        };

        match self.reconcile(&repo, job).await {
            Ok(result) => result,
            Err(e) => {
                warn!(repo = %repo, error = %e, "analysis failed");
                DispatchResult::failure(repo.to_string(), job.sha.clone(), e.public_message())
            }
        }
    }

    async fn reconcile(
        &self,
        repo: &RepoName,
        job: &AnalysisJob,
    ) -> Result<DispatchResult, AnalyzeError> {
        let remote_sha = self.source.latest_sha(repo).await?;
        let local_sha = self.store.last_analyzed_sha(repo).await?;

        if local_sha.as_deref() == Some(remote_sha.as_str()) {
            info!(repo = %repo, sha = %remote_sha, "already analyzed, nothing to do");
            return Ok(DispatchResult::no_change(repo.to_string(), remote_sha));
        }

        let directly_changed = match &local_sha {
            Some(old_sha) => {
                info!(repo = %repo, from = %old_sha, to = %remote_sha, "incremental update");
                self.incremental_update(repo, old_sha, &remote_sha).await?
            }
            None => {
                info!(repo = %repo, sha = %remote_sha, "first analysis");
                self.full_analysis(repo, &job.repo_url).await?;
                Vec::new()
            }
        };

        self.store.set_last_analyzed_sha(repo, &remote_sha).await?;

        let affected = self.blast_radius(repo, &directly_changed).await;
        Ok(DispatchResult::success(
            repo.to_string(),
            remote_sha,
            affected,
        ))
    }

    /// One diff's worth of graph surgery: deletions first, then changed
    /// files re-resolved with bounded parallelism.
    async fn incremental_update(
        &self,
        repo: &RepoName,
        old_sha: &str,
        new_sha: &str,
    ) -> Result<Vec<String>, AnalyzeError> {
        if !self.source.has_mirror(repo).await {
            return Err(SourceError::MirrorMissing(self.source.workdir(repo)).into());
        }

        self.source.fetch(repo).await?;
        let entries = self.source.diff(repo, old_sha, new_sha).await?;
        self.source.checkout(repo, new_sha).await?;

        // Deletion pass completes before any mutation: a file removed in
        // this diff must not resurface as an import target below.
        for entry in entries.iter().filter(|e| e.status == DiffStatus::Deleted) {
            self.store.delete_file(repo, &entry.path).await?;
        }

        // path → was-modified. A map rather than a vec so a path appearing
        // twice in one diff is processed once. Only files the extractor
        // would pick up in a full walk participate: a binary or vendored
        // change carries no import edges, and upserting it would diverge
        // from a fresh full analysis of the same commit.
        let mut changed: BTreeMap<String, bool> = BTreeMap::new();
        for entry in &entries {
            if entry.status == DiffStatus::Deleted {
                continue;
            }
            if !self.extractor.is_source_file(&entry.path) {
                debug!(path = %entry.path, "ignoring non-source change");
                continue;
            }
            if entry.status == DiffStatus::Modified {
                changed.insert(entry.path.clone(), true);
            } else {
                changed.entry(entry.path.clone()).or_insert(false);
            }
        }

        let workdir = self.source.workdir(repo);
        stream::iter(changed.iter().map(|(p, m)| (p.clone(), *m)))
            .map(|(path, modified)| {
                let workdir = workdir.clone();
                Box::pin(async move { self.apply_file(repo, &workdir, &path, modified).await })
                    as Pin<Box<dyn Future<Output = Result<(), AnalyzeError>> + Send + '_>>
            })
            .buffer_unordered(self.file_parallelism)
            .try_collect::<Vec<()>>()
            .await?;

        Ok(changed.into_keys().collect())
    }

    /// First analysis: shallow clone, walk the tree, upsert every file,
    /// then deepen the mirror in the background for future diffs.
    async fn full_analysis(&self, repo: &RepoName, url: &str) -> Result<(), AnalyzeError> {
        self.source.shallow_clone(repo, url).await?;

        let workdir = self.source.workdir(repo);
        let files = self.extractor.list_source_files(&workdir)?;
        info!(repo = %repo, files = files.len(), "analyzing full tree");

        stream::iter(files.iter().cloned())
            .map(|path| {
                Box::pin(async move { self.apply_file(repo, &workdir, &path, false).await })
                    as Pin<Box<dyn Future<Output = Result<(), AnalyzeError>> + Send + '_>>
            })
            .buffer_unordered(self.file_parallelism)
            .try_collect::<Vec<()>>()
            .await?;

        let source = Arc::clone(&self.source);
        let repo = repo.clone();
        tokio::spawn(async move {
            if let Err(e) = source.deepen(&repo).await {
                warn!(repo = %repo, error = %e, "background deepen failed");
            }
        });

        Ok(())
    }

    /// One file's logically atomic update sequence.
    async fn apply_file(
        &self,
        repo: &RepoName,
        workdir: &Path,
        path: &str,
        replace_edges: bool,
    ) -> Result<(), AnalyzeError> {
        if replace_edges {
            self.store.delete_outgoing_edges(repo, path).await?;
        }

        self.store.upsert_file(repo, path, basename(path)).await?;

        for target in self.extractor.extract(workdir, path)? {
            self.store
                .upsert_edge(repo, path, &target, basename(&target))
                .await?;
        }
        Ok(())
    }

    /// Changed files plus every transitive dependent. Per-file query
    /// failures degrade to an empty contribution; the job stays a success.
    async fn blast_radius(&self, repo: &RepoName, directly_changed: &[String]) -> Vec<String> {
        let dependents = stream::iter(directly_changed.iter().cloned())
            .map(|path| {
                Box::pin(async move { self.dependents_for(repo, &path).await })
                    as Pin<Box<dyn Future<Output = Vec<String>> + Send + '_>>
            })
            .buffer_unordered(self.file_parallelism)
            .collect::<Vec<Vec<String>>>()
            .await;

        let mut affected: BTreeSet<String> = directly_changed.iter().cloned().collect();
        affected.extend(dependents.into_iter().flatten());
        affected.into_iter().collect()
    }

    /// One file's transitive-dependent lookup; failures degrade to an empty set.
    async fn dependents_for(&self, repo: &RepoName, path: &str) -> Vec<String> {
        match self.store.recursive_dependents(repo, path).await {
            Ok(nodes) => nodes.into_iter().map(|n| n.path).collect(),
            Err(e) => {
                warn!(repo = %repo, path = %path, error = %e, "dependents query failed, contributing empty set");
                Vec::new()
            }
        }
    }
}
