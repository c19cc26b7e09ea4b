//! The queue contract.

use async_trait::async_trait;
use thiserror::Error;

use crate::{AnalysisJob, DispatchResult};

pub type Result<T> = std::result::Result<T, QueueError>;

#[derive(Debug, Error)]
pub enum QueueError {
    /// The transport could not be reached (after internal backoff).
    #[error("queue unavailable: {0}")]
    Unavailable(String),

    /// A payload could not be serialized for publication.
    #[error("payload serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The queue was shut down and will deliver nothing further.
    #[error("queue closed")]
    Closed,
}

/// One delivered, successfully parsed job.
///
/// `id` is the transport's message id; hand it back to [`JobQueue::ack`]
/// once the job's result has been published.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub id: String,
    pub job: AnalysisJob,
}

/// Reliable work distribution across the analyzer fleet.
///
/// Implementations deliver each message to exactly one consumer at a time
/// and keep it pending until acknowledged — at-least-once overall. Messages
/// whose payload fails to parse are acknowledged and dropped inside
/// [`next_job`](JobQueue::next_job) (poison-pill policy), so callers only
/// ever see valid jobs.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Create the consumer group (and stream) if absent. Safe to repeat.
    async fn ensure_group(&self) -> Result<()>;

    /// Append a job to the analysis stream; returns the message id.
    async fn publish_analysis(&self, job: &AnalysisJob) -> Result<String>;

    /// Block until a job is delivered to this consumer.
    ///
    /// Transport hiccups are retried internally with bounded backoff; an
    /// error return means the queue is closed for good.
    async fn next_job(&self) -> Result<Delivery>;

    /// Remove a message from this consumer's pending set. Failures are
    /// logged by implementations rather than retried — a later redelivery
    /// is acceptable, losing the worker is not.
    async fn ack(&self, id: &str) -> Result<()>;

    /// Append a result to the dispatch stream.
    async fn publish_dispatch(&self, result: &DispatchResult) -> Result<()>;
}
