//! # dora-analyzer
//!
//! The reconciliation engine: given a repository-change job, bring the
//! stored import graph in line with the remote commit and publish the blast
//! radius.
//!
//! Per job, the [`Analyzer`] walks a small state machine:
//!
//! ```text
//! Received → Parsing → Comparing ─┬→ NoChange ────────────┐
//!                                 ├→ Incremental ─┐       │
//!                                 └→ FullAnalysis ┴→ Committing → Publishing
//! ```
//!
//! Every error path converges on a published `failure` result followed by
//! an acknowledgement — a poison job must never be redelivered forever.
//! Every mutation the analyzer performs is idempotent, so the at-least-once
//! queue can hand the same job to two workers without corrupting the graph.
//!
//! External collaborators enter through two seams:
//! - [`SourceProvider`] — commit lookup, mirror maintenance, diffs,
//!   checkouts ([`GitSourceProvider`] shells out to `git` and asks the
//!   GitHub API for heads);
//! - [`ImportExtractor`] — per-file import resolution
//!   ([`EsImportScanner`] scans ES/CommonJS import syntax).

mod analyzer;
mod error;
pub mod extract;
pub mod source;
mod worker;

pub use analyzer::Analyzer;
pub use error::AnalyzeError;
pub use extract::{EsImportScanner, ExtractError, ImportExtractor};
pub use source::{
    DiffEntry, DiffStatus, GitHubClient, GitSourceProvider, SourceError, SourceProvider,
};
pub use worker::Worker;
