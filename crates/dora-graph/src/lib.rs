//! # dora-graph
//!
//! Import-graph data model for Doraemon's blast-radius pipeline.
//!
//! This crate defines the graph vocabulary shared by every other component
//! and provides an in-memory implementation of the store contract. It has no
//! I/O of its own; durable persistence lives in `dora-store`.
//!
//! ## Overview
//!
//! A repository's source files form a directed graph: one [`FileNode`] per
//! tracked file, one `IMPORTS` edge per resolved import. Files are identified
//! by the composite key `(repo, path)` — never by path alone, since many
//! repositories share a store.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                   GraphStore (trait)                 │
//! │   upserts / deletes / one-hop and transitive reads   │
//! └──────────────┬───────────────────────┬───────────────┘
//!                │                       │
//!                ▼                       ▼
//!     ┌────────────────────┐   ┌────────────────────┐
//!     │  MemoryGraphStore  │   │  SurrealGraphStore │
//!     │  (this crate)      │   │  (dora-store)      │
//!     └────────────────────┘   └────────────────────┘
//! ```
//!
//! ## Store contract
//!
//! Every mutation on [`GraphStore`] is idempotent: the pipeline that feeds
//! the graph is at-least-once, so the same job may be applied twice and must
//! leave the same state behind. Transitive queries tolerate cycles — two
//! files importing each other is legal JavaScript and legal here.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use dora_graph::{GraphStore, MemoryGraphStore, RepoName};
//!
//! # async fn demo() -> Result<(), dora_graph::StoreError> {
//! let store = MemoryGraphStore::new();
//! let repo: RepoName = "acme/widget".parse().unwrap();
//!
//! store.upsert_file(&repo, "src/a.ts", "a.ts").await?;
//! store.upsert_edge(&repo, "src/a.ts", "src/b.ts", "b.ts").await?;
//!
//! let dependents = store.dependents(&repo, "src/b.ts").await?;
//! assert_eq!(dependents.len(), 1);
//! # Ok(())
//! # }
//! ```

mod edge;
mod file;
pub mod memory;
mod repo;
mod store;

pub use edge::ImportEdge;
pub use file::{basename, FileNode};
pub use memory::MemoryGraphStore;
pub use repo::{RepoName, RepoNameError};
pub use store::{GraphStore, RepoGraph, Result, StoreError};

#[cfg(test)]
mod tests;
