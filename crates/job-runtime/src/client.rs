//! Client trait for queue operations across all providers.

use crate::error::QueueError;
use crate::job::{JobDescriptor, JobId, PendingJob, QueueName};
use async_trait::async_trait;

/// Main interface for job-queue operations across all providers.
///
/// The contract is intentionally narrow: the dispatch pipeline only ever
/// pushes entries and inspects what is still pending. The "list pending,
/// then push" sequence used for duplicate suppression is NOT transactional;
/// two concurrent pushes of the same work can both pass the pending scan.
/// That window is accepted — downstream workers are expected to be
/// idempotent.
#[async_trait]
pub trait JobQueueClient: Send + Sync {
    /// Submit an entry for execution no earlier than its `scheduled_at`.
    ///
    /// Fire-and-forget: the returned [`JobId`] identifies the queue entry,
    /// not the eventual execution.
    async fn push(&self, job: &JobDescriptor) -> Result<JobId, QueueError>;

    /// List every entry currently waiting in a queue, both immediately
    /// runnable and scheduled for later.
    async fn list_pending(&self, queue: &QueueName) -> Result<Vec<PendingJob>, QueueError>;

    /// Get provider kind
    fn provider_kind(&self) -> ProviderKind;
}

/// Available queue backend kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    InMemory,
    Redis,
}

impl ProviderKind {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InMemory => "memory",
            Self::Redis => "redis",
        }
    }
}
