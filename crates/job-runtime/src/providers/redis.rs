//! Redis-backed queue provider.
//!
//! Storage layout, per queue:
//! - `{prefix}:queue:{name}` — a list of immediately-runnable entries
//!   (RPUSH on submit, so the head is the oldest entry)
//! - `{prefix}:queue:{name}:scheduled` — a sorted set of delayed entries,
//!   scored by the epoch-seconds run-at time
//!
//! Entries are serialized [`PendingJob`] JSON. Workers consume from these
//! structures; this provider only ever appends and reads. `list_pending`
//! is the union of both structures — a delayed entry is still pending work
//! for duplicate-suppression purposes.

use crate::client::{JobQueueClient, ProviderKind};
use crate::error::QueueError;
use crate::job::{JobDescriptor, JobId, PendingJob, QueueName, Timestamp};
use async_trait::async_trait;
use redis::AsyncCommands;
use tracing::debug;

const DEFAULT_KEY_PREFIX: &str = "relay";

/// Redis-backed queue provider implementation
#[derive(Clone)]
pub struct RedisJobQueue {
    client: redis::Client,
    key_prefix: String,
}

impl RedisJobQueue {
    /// Create a provider from a Redis connection string.
    ///
    /// The connection itself is established lazily on first use; this only
    /// validates the URL.
    pub fn new(connection_string: &str) -> Result<Self, QueueError> {
        Self::with_key_prefix(connection_string, DEFAULT_KEY_PREFIX)
    }

    /// Create a provider with a custom key prefix (multi-tenant instances)
    pub fn with_key_prefix(connection_string: &str, prefix: &str) -> Result<Self, QueueError> {
        let client =
            redis::Client::open(connection_string).map_err(|e| QueueError::ConnectionFailed {
                message: format!("invalid Redis connection string: {}", e),
            })?;

        Ok(Self {
            client,
            key_prefix: prefix.to_string(),
        })
    }

    pub(crate) fn queue_key(&self, queue: &QueueName) -> String {
        format!("{}:queue:{}", self.key_prefix, queue)
    }

    pub(crate) fn scheduled_key(&self, queue: &QueueName) -> String {
        format!("{}:queue:{}:scheduled", self.key_prefix, queue)
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, QueueError> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| QueueError::ConnectionFailed {
                message: e.to_string(),
            })
    }

    fn provider_error(error: redis::RedisError) -> QueueError {
        QueueError::ProviderError {
            provider: ProviderKind::Redis.as_str().to_string(),
            message: error.to_string(),
        }
    }
}

impl std::fmt::Debug for RedisJobQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisJobQueue")
            .field("key_prefix", &self.key_prefix)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl JobQueueClient for RedisJobQueue {
    async fn push(&self, job: &JobDescriptor) -> Result<JobId, QueueError> {
        let jid = JobId::new();
        let entry = PendingJob::from_descriptor(job, jid.clone());
        let body = serde_json::to_string(&entry)?;

        let mut con = self.connection().await?;

        if job.scheduled_at <= Timestamp::now() {
            let _: i64 = con
                .rpush(self.queue_key(&job.queue), &body)
                .await
                .map_err(Self::provider_error)?;
        } else {
            let _: i64 = con
                .zadd(
                    self.scheduled_key(&job.queue),
                    &body,
                    job.scheduled_at.epoch_seconds(),
                )
                .await
                .map_err(Self::provider_error)?;
        }

        debug!(
            job_type = %job.job_type,
            queue = %job.queue,
            jid = %jid,
            "Pushed job entry to Redis"
        );

        Ok(jid)
    }

    async fn list_pending(&self, queue: &QueueName) -> Result<Vec<PendingJob>, QueueError> {
        let mut con = self.connection().await?;

        let immediate: Vec<String> = con
            .lrange(self.queue_key(queue), 0, -1)
            .await
            .map_err(Self::provider_error)?;

        let scheduled: Vec<String> = con
            .zrange(self.scheduled_key(queue), 0, -1)
            .await
            .map_err(Self::provider_error)?;

        let mut pending = Vec::with_capacity(immediate.len() + scheduled.len());
        for body in immediate.iter().chain(scheduled.iter()) {
            pending.push(serde_json::from_str(body)?);
        }

        Ok(pending)
    }

    fn provider_kind(&self) -> ProviderKind {
        ProviderKind::Redis
    }
}

#[cfg(test)]
#[path = "redis_tests.rs"]
mod tests;
