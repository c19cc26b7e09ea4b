//! # dora-store
//!
//! Durable graph persistence for Doraemon.
//!
//! [`SurrealGraphStore`] implements the `GraphStore` contract on SurrealDB
//! through the `engine::any` connector, so one binary serves every
//! deployment shape:
//!
//! - `mem://` — ephemeral, for tests;
//! - `rocksdb://path` — embedded single-process storage;
//! - `ws://host:port` — a shared server, which is what a multi-worker
//!   fleet points at.
//!
//! The crate also hosts the graph-service HTTP surface ([`http::router`]):
//! read endpoints for visualization and CI tooling plus the internal
//! mutation routes.

pub mod http;
mod storage;

pub use storage::{SurrealConfig, SurrealGraphStore};
