//! Forge commit lookup via the GitHub REST API.

use reqwest::header;
use serde::Deserialize;

use dora_graph::RepoName;

use super::SourceError;

const DEFAULT_API_BASE: &str = "https://api.github.com";

#[derive(Debug, Deserialize)]
struct CommitResponse {
    sha: String,
}

/// Minimal GitHub API client: one endpoint, the head commit of the default
/// branch.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    api_base: String,
    token: Option<String>,
}

impl GitHubClient {
    /// Unauthenticated requests work but hit much lower rate limits; pass
    /// a token for anything beyond a demo.
    pub fn new(token: Option<String>) -> Self {
        Self::with_api_base(DEFAULT_API_BASE.to_string(), token)
    }

    /// Point at a different API host (tests, GitHub Enterprise).
    pub fn with_api_base(api_base: String, token: Option<String>) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("doraemon-analyzer")
            .build()
            .unwrap_or_default();
        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            token,
        }
    }

    pub async fn latest_sha(&self, repo: &RepoName) -> Result<String, SourceError> {
        let url = format!(
            "{}/repos/{}/{}/commits/HEAD",
            self.api_base,
            repo.owner(),
            repo.name()
        );

        let mut request = self
            .http
            .get(&url)
            .header(header::ACCEPT, "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SourceError::Forge(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SourceError::Forge(format!(
                "{} returned {}",
                url,
                response.status()
            )));
        }

        let commit: CommitResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Forge(e.to_string()))?;
        Ok(commit.sha)
    }
}
