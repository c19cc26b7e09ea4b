//! Redis-streams implementation of the queue.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use redis::aio::MultiplexedConnection;
use redis::streams::{
    StreamAutoClaimOptions, StreamAutoClaimReply, StreamId, StreamReadOptions, StreamReadReply,
};
use redis::AsyncCommands;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use async_trait::async_trait;

use crate::{AnalysisJob, Delivery, DispatchResult, JobQueue, QueueError, Result};

const INITIAL_BACKOFF: Duration = Duration::from_millis(50);
const MAX_BACKOFF: Duration = Duration::from_secs(5);
/// How long one XREADGROUP blocks before we loop and re-check the
/// connection. Bounded so a dead connection is noticed.
const READ_BLOCK_MS: usize = 5_000;
/// Visibility timeout: a pending message idle this long is considered
/// abandoned by its consumer and eligible for XAUTOCLAIM by a peer.
const CLAIM_MIN_IDLE_MS: usize = 60_000;

/// Stream and group names for one deployment.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    pub analysis_stream: String,
    pub dispatch_stream: String,
    pub group: String,
    /// Unique per worker. Defaults to `$HOSTNAME` or a random token.
    pub consumer: String,
}

impl StreamConfig {
    pub fn new(analysis_stream: String, dispatch_stream: String, group: String) -> Self {
        let consumer = std::env::var("HOSTNAME")
            .ok()
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| format!("worker-{}", Uuid::new_v4().simple()));
        Self {
            analysis_stream,
            dispatch_stream,
            group,
            consumer,
        }
    }
}

/// Exponential reconnect backoff, 50 ms doubling to a 5 s cap.
struct Backoff {
    delay: Duration,
}

impl Backoff {
    fn new() -> Self {
        Self {
            delay: INITIAL_BACKOFF,
        }
    }

    async fn wait(&mut self) {
        tokio::time::sleep(self.delay).await;
        self.delay = (self.delay * 2).min(MAX_BACKOFF);
    }

    fn reset(&mut self) {
        self.delay = INITIAL_BACKOFF;
    }
}

/// [`JobQueue`] over Redis streams with a consumer group.
///
/// One instance per process; the multiplexed connection is shared by all
/// operations and re-established on failure.
///
/// Crash recovery: messages delivered to this consumer name but never
/// acknowledged survive in the group's pending list. [`next_job`] drains
/// that backlog before asking for fresh messages, and when the stream goes
/// idle it additionally claims messages stuck with dead peers past the
/// visibility timeout — the in-memory queue's `redeliver_pending` made
/// real.
///
/// [`next_job`]: JobQueue::next_job
pub struct RedisJobQueue {
    client: redis::Client,
    conn: Mutex<Option<MultiplexedConnection>>,
    config: StreamConfig,
    /// Flips once the own-name pending backlog has been drained after
    /// startup; fresh `>` reads take over from there.
    backlog_done: AtomicBool,
}

impl RedisJobQueue {
    /// Validate the URL and prepare a client. No connection is made until
    /// the first operation.
    pub fn new(redis_url: &str, config: StreamConfig) -> Result<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| QueueError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            conn: Mutex::new(None),
            config,
            backlog_done: AtomicBool::new(false),
        })
    }

    pub fn consumer_name(&self) -> &str {
        &self.config.consumer
    }

    /// Current connection, establishing one if needed. Single attempt;
    /// callers own the retry policy.
    async fn connection(&self) -> Result<MultiplexedConnection> {
        let mut guard = self.conn.lock().await;
        if let Some(conn) = guard.as_ref() {
            return Ok(conn.clone());
        }
        let conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| QueueError::Unavailable(e.to_string()))?;
        *guard = Some(conn.clone());
        Ok(conn)
    }

    /// Drop the cached connection so the next operation reconnects.
    async fn invalidate(&self) {
        *self.conn.lock().await = None;
    }

    /// First parseable job among `entries`. Poison entries (no payload
    /// field, unparseable JSON) are acked and dropped along the way so
    /// they never circulate again.
    async fn first_delivery(&self, entries: Vec<StreamId>) -> Option<Delivery> {
        for entry in entries {
            let Some(raw) = entry.get::<String>("payload") else {
                warn!(id = %entry.id, "message without payload field, dropping");
                let _ = self.ack(&entry.id).await;
                continue;
            };
            match serde_json::from_str::<AnalysisJob>(&raw) {
                Ok(job) => return Some(Delivery { id: entry.id, job }),
                Err(e) => {
                    warn!(id = %entry.id, error = %e, "unparseable job payload, dropping");
                    let _ = self.ack(&entry.id).await;
                }
            }
        }
        None
    }

    /// Claim one message abandoned by a dead peer (pending longer than the
    /// visibility timeout). Called when the stream is otherwise idle.
    async fn claim_stale(&self, conn: &mut MultiplexedConnection) -> Result<Option<Delivery>> {
        let opts = StreamAutoClaimOptions::default().count(1);
        let reply: StreamAutoClaimReply = conn
            .xautoclaim_options(
                &self.config.analysis_stream,
                &self.config.group,
                &self.config.consumer,
                CLAIM_MIN_IDLE_MS,
                "0-0",
                opts,
            )
            .await
            .map_err(|e| QueueError::Unavailable(e.to_string()))?;

        if !reply.claimed.is_empty() {
            info!(
                consumer = %self.config.consumer,
                count = reply.claimed.len(),
                "claimed stale pending messages from a peer"
            );
        }
        Ok(self.first_delivery(reply.claimed).await)
    }

    async fn publish(&self, stream: &str, payload: String) -> Result<String> {
        // One reconnect attempt before giving up: callers at the HTTP
        // boundary need a bounded failure, not an infinite retry.
        for attempt in 0..2 {
            let mut conn = self.connection().await?;
            match conn
                .xadd::<_, _, _, _, String>(stream, "*", &[("payload", payload.as_str())])
                .await
            {
                Ok(id) => return Ok(id),
                Err(e) if attempt == 0 => {
                    warn!(stream, error = %e, "publish failed, reconnecting");
                    self.invalidate().await;
                }
                Err(e) => return Err(QueueError::Unavailable(e.to_string())),
            }
        }
        unreachable!("publish loop returns on success or second failure")
    }
}

#[async_trait]
impl JobQueue for RedisJobQueue {
    async fn ensure_group(&self) -> Result<()> {
        let mut conn = self.connection().await?;
        let created: std::result::Result<(), redis::RedisError> = conn
            .xgroup_create_mkstream(&self.config.analysis_stream, &self.config.group, "$")
            .await;
        match created {
            Ok(()) => {
                debug!(
                    stream = %self.config.analysis_stream,
                    group = %self.config.group,
                    "created consumer group"
                );
                Ok(())
            }
            Err(e) if e.to_string().contains("BUSYGROUP") => Ok(()),
            Err(e) => Err(QueueError::Unavailable(e.to_string())),
        }
    }

    async fn publish_analysis(&self, job: &AnalysisJob) -> Result<String> {
        let payload = serde_json::to_string(job)?;
        self.publish(&self.config.analysis_stream, payload).await
    }

    async fn next_job(&self) -> Result<Delivery> {
        let fresh_opts = StreamReadOptions::default()
            .group(&self.config.group, &self.config.consumer)
            .block(READ_BLOCK_MS)
            .count(1);
        // Backlog reads must not block: an empty reply is the signal that
        // recovery is complete.
        let backlog_opts = StreamReadOptions::default()
            .group(&self.config.group, &self.config.consumer)
            .count(1);
        let mut backoff = Backoff::new();

        loop {
            let mut conn = match self.connection().await {
                Ok(conn) => conn,
                Err(e) => {
                    warn!(error = %e, "queue connection failed, backing off");
                    backoff.wait().await;
                    continue;
                }
            };

            // Crash recovery: replay messages this consumer name received
            // before a restart (id `0` reads our own pending list) until
            // it runs dry, then switch to fresh delivery.
            if !self.backlog_done.load(Ordering::Acquire) {
                let reply: StreamReadReply = match conn
                    .xread_options(
                        &[self.config.analysis_stream.as_str()],
                        &["0"],
                        &backlog_opts,
                    )
                    .await
                {
                    Ok(reply) => reply,
                    Err(e) => {
                        warn!(error = %e, "pending-backlog read failed, reconnecting");
                        self.invalidate().await;
                        backoff.wait().await;
                        continue;
                    }
                };
                backoff.reset();

                let entries = flatten(reply);
                if entries.is_empty() {
                    self.backlog_done.store(true, Ordering::Release);
                } else if let Some(delivery) = self.first_delivery(entries).await {
                    info!(id = %delivery.id, "recovered pending job from previous run");
                    return Ok(delivery);
                }
                continue;
            }

            let reply: StreamReadReply = match conn
                .xread_options(
                    &[self.config.analysis_stream.as_str()],
                    &[">"],
                    &fresh_opts,
                )
                .await
            {
                Ok(reply) => reply,
                Err(e) => {
                    warn!(error = %e, "stream read failed, reconnecting");
                    self.invalidate().await;
                    backoff.wait().await;
                    continue;
                }
            };
            backoff.reset();

            if let Some(delivery) = self.first_delivery(flatten(reply)).await {
                return Ok(delivery);
            }

            // Block timeout with nothing fresh: a good moment to pick up
            // messages stuck with a crashed peer.
            match self.claim_stale(&mut conn).await {
                Ok(Some(delivery)) => return Ok(delivery),
                Ok(None) => {}
                Err(e) => {
                    // Older servers lack XAUTOCLAIM; reclaim is then down
                    // to operators, not a reason to stop consuming.
                    debug!(error = %e, "autoclaim attempt failed");
                }
            }
        }
    }

    async fn ack(&self, id: &str) -> Result<()> {
        let mut conn = self.connection().await?;
        match conn
            .xack::<_, _, _, i64>(&self.config.analysis_stream, &self.config.group, &[id])
            .await
        {
            Ok(_) => Ok(()),
            Err(e) => {
                // Not retried: a redelivered job is re-applied idempotently.
                warn!(id, error = %e, "ack failed");
                self.invalidate().await;
                Err(QueueError::Unavailable(e.to_string()))
            }
        }
    }

    async fn publish_dispatch(&self, result: &DispatchResult) -> Result<()> {
        let payload = serde_json::to_string(result)?;
        self.publish(&self.config.dispatch_stream, payload).await?;
        Ok(())
    }
}

fn flatten(reply: StreamReadReply) -> Vec<StreamId> {
    reply.keys.into_iter().flat_map(|key| key.ids).collect()
}
