//! Wire payloads carried on the streams.
//!
//! The original webhook plumbing shipped loose JSON blobs; here every
//! message is a typed record with an explicit poison-pill path for anything
//! that fails to parse.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One repository-change event, as enqueued by the ingester.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisJob {
    pub repo_url: String,
    pub sha: String,
    pub event: String,
    #[serde(default)]
    pub pr_number: Option<i64>,
    pub received_at: DateTime<Utc>,
}

/// Outcome of one analysis job, as published on the dispatch stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchResult {
    pub repo_name: String,
    pub sha: String,
    pub status: JobStatus,
    pub affected_files: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    #[serde(rename = "success")]
    Success,
    #[serde(rename = "no-change")]
    NoChange,
    #[serde(rename = "failure")]
    Failure,
}

impl DispatchResult {
    pub fn success(repo_name: String, sha: String, affected_files: Vec<String>) -> Self {
        Self {
            repo_name,
            sha,
            status: JobStatus::Success,
            affected_files,
            error: None,
        }
    }

    pub fn no_change(repo_name: String, sha: String) -> Self {
        Self {
            repo_name,
            sha,
            status: JobStatus::NoChange,
            affected_files: Vec::new(),
            error: None,
        }
    }

    /// A failure result. The message must already be publicly safe — it
    /// goes on the wire for downstream consumers.
    pub fn failure(repo_name: String, sha: String, error: String) -> Self {
        Self {
            repo_name,
            sha,
            status: JobStatus::Failure,
            affected_files: Vec::new(),
            error: Some(error),
        }
    }
}
