//! # dora-queue
//!
//! Work distribution for the analysis pipeline: an inbound stream of
//! repository-change jobs consumed by a named consumer group, and an
//! outbound stream of blast-radius results.
//!
//! Delivery is **at-least-once**. A job stays in a consumer's pending set
//! until explicitly acknowledged; a worker that crashes mid-job leaves the
//! message eligible for redelivery. Everything downstream of this crate is
//! therefore written to be idempotent.
//!
//! Two implementations of [`JobQueue`]:
//! - [`RedisJobQueue`] — Redis streams (`XADD` / `XREADGROUP` / `XACK`),
//!   the production transport.
//! - [`MemoryJobQueue`] — in-process queue with the same pending-set
//!   semantics, for tests and single-process development.

mod memory;
mod payload;
mod queue;
mod stream;

pub use memory::MemoryJobQueue;
pub use payload::{AnalysisJob, DispatchResult, JobStatus};
pub use queue::{Delivery, JobQueue, QueueError, Result};
pub use stream::{RedisJobQueue, StreamConfig};
