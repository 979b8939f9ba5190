//! Advisory duplicate-job suppression.
//!
//! The platform redelivers notifications on retry, and its own delivery can
//! race with itself; both produce the same logical job twice. Before
//! dispatch, the suppressor scans the entries currently pending in the
//! candidate's destination queue and skips the push when an entry with the
//! same `job_type` and deeply-equal `args` is already waiting.
//!
//! The "list pending, then push" sequence is not atomic with respect to the
//! dispatcher: two concurrent deliveries can both pass the scan and both
//! push. That window is a bounded, rare inefficiency, accepted because
//! downstream workers are idempotent. Do not wrap the sequence in a lock or
//! transaction.

use job_runtime::{JobDescriptor, JobQueueClient, QueueError};
use tracing::debug;

/// Scans pending queue entries to skip byte-for-byte duplicate jobs.
///
/// Operators disable the scan entirely via configuration, in which case
/// every candidate is dispatched unconditionally.
#[derive(Debug, Clone, Copy)]
pub struct DuplicateSuppressor {
    enabled: bool,
}

impl DuplicateSuppressor {
    /// Create a suppressor; `enabled` comes from the operator toggle
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Whether the pending scan is active
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Check whether a candidate duplicates an entry already pending in its
    /// destination queue.
    pub async fn is_duplicate(
        &self,
        candidate: &JobDescriptor,
        queue_client: &dyn JobQueueClient,
    ) -> Result<bool, QueueError> {
        if !self.enabled {
            return Ok(false);
        }

        let pending = queue_client.list_pending(&candidate.queue).await?;
        let duplicate = pending.iter().any(|entry| candidate.same_work_as(entry));

        if duplicate {
            debug!(
                job_type = %candidate.job_type,
                queue = %candidate.queue,
                "Candidate job duplicates a pending entry"
            );
        }

        Ok(duplicate)
    }
}

#[cfg(test)]
#[path = "dedup_tests.rs"]
mod tests;
