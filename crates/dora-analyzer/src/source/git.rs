//! Git-backed source provider.
//!
//! Shells out to the system `git` against a per-worker mirror cache. The
//! cache directory is private to the worker process, and a worker runs one
//! job at a time, so no locking is needed around the working tree.

use std::path::{Path, PathBuf};
use std::process::Output;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use dora_graph::RepoName;

use super::{parse_name_status, DiffEntry, GitHubClient, SourceError, SourceProvider};

/// [`SourceProvider`] over git subprocesses and the GitHub API.
pub struct GitSourceProvider {
    mirror_base: PathBuf,
    github: GitHubClient,
}

impl GitSourceProvider {
    pub fn new(mirror_base: PathBuf, github: GitHubClient) -> Self {
        Self {
            mirror_base,
            github,
        }
    }

    async fn run_git(&self, cwd: &Path, args: &[&str]) -> Result<Output, SourceError> {
        debug!(?cwd, ?args, "running git");
        let output = Command::new("git")
            .args(args)
            .current_dir(cwd)
            .output()
            .await?;

        if output.status.success() {
            Ok(output)
        } else {
            Err(SourceError::Git {
                command: args.join(" "),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }

    fn require_mirror(&self, repo: &RepoName) -> Result<PathBuf, SourceError> {
        let dir = self.workdir(repo);
        if dir.join(".git").is_dir() {
            Ok(dir)
        } else {
            Err(SourceError::MirrorMissing(dir))
        }
    }
}

#[async_trait]
impl SourceProvider for GitSourceProvider {
    async fn latest_sha(&self, repo: &RepoName) -> Result<String, SourceError> {
        self.github.latest_sha(repo).await
    }

    async fn has_mirror(&self, repo: &RepoName) -> bool {
        self.workdir(repo).join(".git").is_dir()
    }

    async fn shallow_clone(&self, repo: &RepoName, url: &str) -> Result<(), SourceError> {
        let dir = self.workdir(repo);

        // A redelivered first-analysis job finds the mirror already there;
        // refresh instead of failing on the non-empty directory.
        if dir.join(".git").is_dir() {
            self.fetch(repo).await?;
            return Ok(());
        }

        if let Some(parent) = dir.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let dir_arg = dir.to_string_lossy().into_owned();
        self.run_git(
            Path::new("."),
            &["clone", "--depth", "1", url, dir_arg.as_str()],
        )
        .await?;
        Ok(())
    }

    async fn fetch(&self, repo: &RepoName) -> Result<(), SourceError> {
        let dir = self.require_mirror(repo)?;
        self.run_git(&dir, &["fetch", "origin"]).await?;
        Ok(())
    }

    async fn diff(
        &self,
        repo: &RepoName,
        old: &str,
        new: &str,
    ) -> Result<Vec<DiffEntry>, SourceError> {
        let dir = self.require_mirror(repo)?;
        let output = self
            .run_git(&dir, &["diff", "--name-status", old, new])
            .await?;
        Ok(parse_name_status(&String::from_utf8_lossy(&output.stdout)))
    }

    async fn checkout(&self, repo: &RepoName, sha: &str) -> Result<(), SourceError> {
        let dir = self.require_mirror(repo)?;
        self.run_git(&dir, &["checkout", "--force", sha]).await?;
        Ok(())
    }

    async fn deepen(&self, repo: &RepoName) -> Result<(), SourceError> {
        let dir = self.require_mirror(repo)?;
        self.run_git(&dir, &["fetch", "--unshallow", "origin"])
            .await?;
        Ok(())
    }

    fn workdir(&self, repo: &RepoName) -> PathBuf {
        self.mirror_base.join(repo.owner()).join(repo.name())
    }
}
