//! Repository identity.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A validated `owner/name` repository identifier.
///
/// This is the namespace half of every file's composite identity. Parsing is
/// strict about shape (exactly one slash, both halves non-empty) but not
/// about the character set — the forge is the authority on what names exist.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RepoName(String);

#[derive(Debug, Error)]
pub enum RepoNameError {
    #[error("repository name must be of the form owner/name, got {0:?}")]
    InvalidShape(String),

    #[error("unsupported remote URL: {0:?}")]
    InvalidUrl(String),
}

impl RepoName {
    /// The `owner` half.
    pub fn owner(&self) -> &str {
        self.0.split('/').next().unwrap_or_default()
    }

    /// The `name` half.
    pub fn name(&self) -> &str {
        self.0.split('/').nth(1).unwrap_or_default()
    }

    /// The full `owner/name` string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Derive the repository name from a remote URL.
    ///
    /// Accepts the https form (`https://github.com/owner/name`), the ssh
    /// form (`git@github.com:owner/name`), and either with a trailing
    /// `.git`. Anything else is rejected — a malformed URL on a job is a
    /// poison input, not something to guess at.
    pub fn from_remote_url(url: &str) -> Result<Self, RepoNameError> {
        let trimmed = url.trim().trim_end_matches('/');

        let tail = if let Some(rest) = trimmed.strip_prefix("https://") {
            rest.split_once('/').map(|(_, t)| t)
        } else if let Some(rest) = trimmed.strip_prefix("http://") {
            rest.split_once('/').map(|(_, t)| t)
        } else if let Some(rest) = trimmed.strip_prefix("git@") {
            rest.split_once(':').map(|(_, t)| t)
        } else {
            None
        };

        let tail = tail.ok_or_else(|| RepoNameError::InvalidUrl(url.to_string()))?;
        let tail = tail.strip_suffix(".git").unwrap_or(tail);

        tail.parse()
            .map_err(|_| RepoNameError::InvalidUrl(url.to_string()))
    }
}

impl FromStr for RepoName {
    type Err = RepoNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split('/').collect::<Vec<_>>().as_slice() {
            [owner, name] if !owner.is_empty() && !name.is_empty() => {
                Ok(Self(format!("{owner}/{name}")))
            }
            _ => Err(RepoNameError::InvalidShape(s.to_string())),
        }
    }
}

impl fmt::Display for RepoName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
