//! The end-to-end dispatch pipeline.
//!
//! Wires the stages together per request: parse and detect the transport,
//! verify authenticity (direct path only), normalize to the canonical event,
//! evaluate the lifecycle gate, build jobs from the routing table, suppress
//! duplicates, and dispatch what remains.
//!
//! The pipeline holds no per-request state; every collaborator is an
//! injected, shared, immutable dependency, so any number of requests run it
//! concurrently. Suspension happens only at the external boundaries: the
//! cache read and the queue list/push calls.

use crate::alerts::{AlertSink, AuthenticityAlert};
use crate::dedup::DuplicateSuppressor;
use crate::lifecycle::{ExistenceCache, GateDecision, LifecycleGate, LifecycleKey};
use crate::routing::RoutingTable;
use crate::signature::{SignatureError, SignatureVerifier};
use crate::webhook::{Transport, WebhookEnvelope, WebhookError, WebhookHeaders};
use crate::Topic;
use job_runtime::{JobId, JobQueueClient, QueueName, Timestamp};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, instrument};

// ============================================================================
// Result Types
// ============================================================================

/// What happened to one candidate job
#[derive(Debug, Clone)]
pub enum JobOutcome {
    /// Submitted to its destination queue
    Dispatched {
        job_type: String,
        queue: QueueName,
        jid: JobId,
    },

    /// Skipped: an identical entry was already pending
    DuplicateSuppressed { job_type: String, queue: QueueName },
}

/// Result of handling one webhook request.
///
/// Both variants acknowledge the request as handled (`200 OK`); suppression
/// is an outcome, never an error.
#[derive(Debug, Clone)]
pub enum DispatchSummary {
    /// The event was routed; per-job outcomes inside
    Dispatched { jobs: Vec<JobOutcome> },

    /// The lifecycle gate dropped the event before routing
    LifecycleSuppressed { key: Option<LifecycleKey> },
}

impl DispatchSummary {
    /// Number of jobs actually submitted to a queue
    pub fn dispatched_count(&self) -> usize {
        match self {
            Self::Dispatched { jobs } => jobs
                .iter()
                .filter(|outcome| matches!(outcome, JobOutcome::Dispatched { .. }))
                .count(),
            Self::LifecycleSuppressed { .. } => 0,
        }
    }
}

// ============================================================================
// WebhookPipeline
// ============================================================================

/// The assembled dispatch pipeline, constructed once at process start
pub struct WebhookPipeline {
    verifier: Arc<dyn SignatureVerifier>,
    gate: LifecycleGate,
    routing: RoutingTable,
    suppressor: DuplicateSuppressor,
    queue: Arc<dyn JobQueueClient>,
    alerts: Arc<dyn AlertSink>,
}

impl WebhookPipeline {
    /// Assemble the pipeline from its collaborators.
    ///
    /// `check_duplicate_jobs` is the operator toggle for the pending-scan
    /// duplicate suppression.
    pub fn new(
        verifier: Arc<dyn SignatureVerifier>,
        cache: Arc<dyn ExistenceCache>,
        queue: Arc<dyn JobQueueClient>,
        alerts: Arc<dyn AlertSink>,
        routing: RoutingTable,
        check_duplicate_jobs: bool,
    ) -> Self {
        Self {
            verifier,
            gate: LifecycleGate::new(cache),
            routing,
            suppressor: DuplicateSuppressor::new(check_duplicate_jobs),
            queue,
            alerts,
        }
    }

    /// Run one request through the pipeline.
    ///
    /// `raw_body` must be the exact bytes received — the direct path's
    /// signature is computed over them, and any re-serialization would
    /// invalidate it.
    #[instrument(skip(self, headers, raw_body), fields(topic = %topic, body_len = raw_body.len()))]
    pub async fn handle(
        &self,
        topic: Topic,
        headers: &WebhookHeaders,
        raw_body: &[u8],
    ) -> Result<DispatchSummary, WebhookError> {
        // Shape detection must precede verification: the relayed envelope
        // is authenticated upstream and carries no signature header.
        let body: Value = serde_json::from_slice(raw_body)?;
        let envelope = WebhookEnvelope::detect(body)?;

        if envelope.transport() == Transport::DirectWebhook {
            if let Err(error) = self
                .verifier
                .verify(raw_body, headers.hmac_signature.as_deref())
                .await
            {
                self.alert_denied(topic, headers, &error);
                return Err(WebhookError::Unauthenticated);
            }
        }

        let event = envelope.into_event(topic, headers)?;

        match self
            .gate
            .evaluate(event.topic, event.resource_id.as_deref())
            .await?
        {
            GateDecision::Allow => {}
            GateDecision::Suppress { key } => {
                info!(
                    shop_domain = %event.shop_domain,
                    key = key.as_ref().map(LifecycleKey::as_str).unwrap_or("<none>"),
                    "Suppressing lifecycle event: creation not yet observed"
                );
                return Ok(DispatchSummary::LifecycleSuppressed { key });
            }
        }

        let jobs = self.routing.build_jobs(&event, Timestamp::now())?;

        let mut outcomes = Vec::with_capacity(jobs.len());
        for job in jobs {
            if self.suppressor.is_duplicate(&job, self.queue.as_ref()).await? {
                info!(
                    job_type = %job.job_type,
                    queue = %job.queue,
                    "Suppressing duplicate job: identical entry already pending"
                );
                outcomes.push(JobOutcome::DuplicateSuppressed {
                    job_type: job.job_type,
                    queue: job.queue,
                });
                continue;
            }

            let jid = self.queue.push(&job).await?;
            info!(
                job_type = %job.job_type,
                queue = %job.queue,
                jid = %jid,
                "Job dispatched"
            );
            outcomes.push(JobOutcome::Dispatched {
                job_type: job.job_type,
                queue: job.queue,
                jid,
            });
        }

        Ok(DispatchSummary::Dispatched { jobs: outcomes })
    }

    /// Report a denied webhook to the alert sink.
    ///
    /// The report carries the two HMAC values and the request identity only.
    fn alert_denied(&self, topic: Topic, headers: &WebhookHeaders, error: &SignatureError) {
        let (computed, received) = match error {
            SignatureError::Mismatch { computed, received } => {
                (Some(computed.clone()), Some(received.clone()))
            }
            SignatureError::MissingHeader => (None, None),
            SignatureError::InvalidKey => (None, headers.hmac_signature.clone()),
        };

        self.alerts.webhook_denied(AuthenticityAlert {
            topic,
            shop_domain: headers.shop_domain.clone(),
            computed_signature: computed,
            received_signature: received,
        });
    }
}

impl std::fmt::Debug for WebhookPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookPipeline")
            .field("gate", &self.gate)
            .field("routing", &self.routing)
            .field("suppressor", &self.suppressor)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
