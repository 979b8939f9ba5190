//! In-memory queue provider for testing and development.
//!
//! Fully functional against the [`JobQueueClient`] contract: entries are
//! kept per queue in insertion order and remain listed until explicitly
//! drained. There is no worker loop here — in tests the pending set doubles
//! as the assertion surface for what the pipeline dispatched.

use crate::client::{JobQueueClient, ProviderKind};
use crate::error::QueueError;
use crate::job::{JobDescriptor, JobId, PendingJob, QueueName};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};

/// Thread-safe storage for all queues
#[derive(Default)]
struct QueueStorage {
    queues: HashMap<QueueName, VecDeque<PendingJob>>,
}

/// In-memory queue provider implementation
#[derive(Clone, Default)]
pub struct InMemoryJobQueue {
    storage: Arc<RwLock<QueueStorage>>,
}

impl InMemoryJobQueue {
    /// Create new empty in-memory provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries currently pending in a queue (test convenience)
    pub fn pending_count(&self, queue: &QueueName) -> usize {
        self.storage
            .read()
            .map(|s| s.queues.get(queue).map_or(0, VecDeque::len))
            .unwrap_or(0)
    }

    /// Remove and return every pending entry in a queue (test convenience)
    pub fn drain(&self, queue: &QueueName) -> Vec<PendingJob> {
        self.storage
            .write()
            .map(|mut s| {
                s.queues
                    .remove(queue)
                    .map(|entries| Vec::from(entries))
                    .unwrap_or_default()
            })
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for InMemoryJobQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryJobQueue").finish_non_exhaustive()
    }
}

#[async_trait]
impl JobQueueClient for InMemoryJobQueue {
    async fn push(&self, job: &JobDescriptor) -> Result<JobId, QueueError> {
        let jid = JobId::new();
        let entry = PendingJob::from_descriptor(job, jid.clone());

        let mut storage = self.storage.write().map_err(|e| QueueError::ProviderError {
            provider: ProviderKind::InMemory.as_str().to_string(),
            message: format!("storage lock poisoned: {}", e),
        })?;

        storage
            .queues
            .entry(job.queue.clone())
            .or_default()
            .push_back(entry);

        Ok(jid)
    }

    async fn list_pending(&self, queue: &QueueName) -> Result<Vec<PendingJob>, QueueError> {
        let storage = self.storage.read().map_err(|e| QueueError::ProviderError {
            provider: ProviderKind::InMemory.as_str().to_string(),
            message: format!("storage lock poisoned: {}", e),
        })?;

        Ok(storage
            .queues
            .get(queue)
            .map(|entries| entries.iter().cloned().collect())
            .unwrap_or_default())
    }

    fn provider_kind(&self) -> ProviderKind {
        ProviderKind::InMemory
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
