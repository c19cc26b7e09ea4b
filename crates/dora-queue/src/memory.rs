//! In-process queue with pending-set semantics.
//!
//! Mirrors the Redis implementation's delivery contract closely enough that
//! analyzer tests exercise real redelivery behavior: messages move to a
//! pending set on delivery, return on [`MemoryJobQueue::redeliver_pending`],
//! and disappear on ack.

use std::collections::VecDeque;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::warn;

use async_trait::async_trait;

use crate::{AnalysisJob, Delivery, DispatchResult, JobQueue, QueueError, Result};

#[derive(Default)]
struct State {
    /// Undelivered messages: `(id, raw payload)`.
    ready: VecDeque<(String, String)>,
    /// Delivered but unacknowledged.
    pending: Vec<(String, String)>,
    /// Everything published to the dispatch stream.
    dispatched: Vec<DispatchResult>,
    next_id: u64,
    closed: bool,
}

/// In-memory [`JobQueue`] for tests and single-process runs.
#[derive(Default)]
pub struct MemoryJobQueue {
    state: Mutex<State>,
    notify: Notify,
}

impl MemoryJobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a raw payload, bypassing serialization. Lets tests inject
    /// poison messages.
    pub fn publish_raw(&self, payload: impl Into<String>) -> String {
        let mut state = self.state.lock();
        let id = format!("{}-0", state.next_id);
        state.next_id += 1;
        state.ready.push_back((id.clone(), payload.into()));
        drop(state);
        self.notify.notify_one();
        id
    }

    /// Move every pending message back to the front of the queue,
    /// simulating a visibility-timeout reclaim after a worker crash.
    pub fn redeliver_pending(&self) {
        let mut state = self.state.lock();
        let pending = std::mem::take(&mut state.pending);
        for entry in pending.into_iter().rev() {
            state.ready.push_front(entry);
        }
        drop(state);
        self.notify.notify_one();
    }

    /// Snapshot of the dispatch stream.
    pub fn dispatched(&self) -> Vec<DispatchResult> {
        self.state.lock().dispatched.clone()
    }

    /// Message ids currently delivered-but-unacknowledged.
    pub fn pending_ids(&self) -> Vec<String> {
        self.state.lock().pending.iter().map(|(id, _)| id.clone()).collect()
    }

    /// Close the queue: `next_job` returns [`QueueError::Closed`] once the
    /// ready queue drains.
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.notify.notify_waiters();
    }
}

#[async_trait]
impl JobQueue for MemoryJobQueue {
    async fn ensure_group(&self) -> Result<()> {
        Ok(())
    }

    async fn publish_analysis(&self, job: &AnalysisJob) -> Result<String> {
        let payload = serde_json::to_string(job)?;
        Ok(self.publish_raw(payload))
    }

    async fn next_job(&self) -> Result<Delivery> {
        loop {
            // Register interest before checking state so a publish between
            // the check and the await is not lost.
            let notified = self.notify.notified();

            let popped = {
                let mut state = self.state.lock();
                match state.ready.pop_front() {
                    Some((id, raw)) => {
                        state.pending.push((id.clone(), raw.clone()));
                        Some((id, raw))
                    }
                    None if state.closed => return Err(QueueError::Closed),
                    None => None,
                }
            };

            match popped {
                Some((id, raw)) => match serde_json::from_str::<AnalysisJob>(&raw) {
                    Ok(job) => return Ok(Delivery { id, job }),
                    Err(e) => {
                        warn!(id = %id, error = %e, "unparseable job payload, dropping");
                        self.ack(&id).await?;
                    }
                },
                None => notified.await,
            }
        }
    }

    async fn ack(&self, id: &str) -> Result<()> {
        self.state.lock().pending.retain(|(pid, _)| pid != id);
        Ok(())
    }

    async fn publish_dispatch(&self, result: &DispatchResult) -> Result<()> {
        self.state.lock().dispatched.push(result.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn job(sha: &str) -> AnalysisJob {
        AnalysisJob {
            repo_url: "https://github.com/acme/widget".into(),
            sha: sha.into(),
            event: "push".into(),
            pr_number: None,
            received_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn delivers_in_publish_order() {
        let queue = MemoryJobQueue::new();
        queue.publish_analysis(&job("a")).await.unwrap();
        queue.publish_analysis(&job("b")).await.unwrap();

        assert_eq!(queue.next_job().await.unwrap().job.sha, "a");
        assert_eq!(queue.next_job().await.unwrap().job.sha, "b");
    }

    #[tokio::test]
    async fn delivered_jobs_stay_pending_until_ack() {
        let queue = MemoryJobQueue::new();
        queue.publish_analysis(&job("a")).await.unwrap();

        let delivery = queue.next_job().await.unwrap();
        assert_eq!(queue.pending_ids(), vec![delivery.id.clone()]);

        queue.ack(&delivery.id).await.unwrap();
        assert!(queue.pending_ids().is_empty());
    }

    #[tokio::test]
    async fn redelivers_unacked_jobs() {
        let queue = MemoryJobQueue::new();
        queue.publish_analysis(&job("a")).await.unwrap();

        let first = queue.next_job().await.unwrap();
        queue.redeliver_pending();

        let second = queue.next_job().await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.job.sha, "a");
    }

    #[tokio::test]
    async fn poison_payload_is_acked_and_skipped() {
        let queue = MemoryJobQueue::new();
        queue.publish_raw("{not json");
        queue.publish_analysis(&job("good")).await.unwrap();

        let delivery = queue.next_job().await.unwrap();
        assert_eq!(delivery.job.sha, "good");
        // Only the good job is pending; the poison one was dropped.
        assert_eq!(queue.pending_ids().len(), 1);
    }

    #[tokio::test]
    async fn close_drains_then_errors() {
        let queue = MemoryJobQueue::new();
        queue.publish_analysis(&job("a")).await.unwrap();
        queue.close();

        assert!(queue.next_job().await.is_ok());
        assert!(matches!(queue.next_job().await, Err(QueueError::Closed)));
    }

    #[tokio::test]
    async fn next_job_wakes_on_publish() {
        use std::sync::Arc;

        let queue = Arc::new(MemoryJobQueue::new());
        let waiter = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.next_job().await })
        };

        tokio::task::yield_now().await;
        queue.publish_analysis(&job("late")).await.unwrap();

        let delivery = waiter.await.unwrap().unwrap();
        assert_eq!(delivery.job.sha, "late");
    }
}
