//! Causal-ordering safeguard for resource lifecycle events.
//!
//! Webhook delivery carries no cross-topic ordering guarantee: an update
//! notification can arrive before the create notification for the same
//! resource. The gate closes the common race by consulting an existence
//! cache — a key whose mere presence records that the resource's creation
//! has already been processed. The marker itself is written by the
//! create-path's downstream job, not by this service.
//!
//! This is best-effort, not strict: an update suppressed here is never
//! replayed once the marker appears later. The check is a plain
//! read-then-act against shared external state; do not add locking or
//! conditional writes — stronger atomicity would change dispatch timing and
//! is tracked as possible future hardening, not a correctness requirement.

use crate::{ResourceKind, Topic, TopicAction};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

// ============================================================================
// Core Types
// ============================================================================

/// Cache key recording that a resource's creation has been processed.
///
/// Format: `{resource_kind}_{resource_id}`, built only for resource kinds in
/// the gating allow-list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LifecycleKey(String);

impl LifecycleKey {
    /// Build the key for a resource
    pub fn new(kind: ResourceKind, resource_id: &str) -> Self {
        Self(format!("{}_{}", kind.as_str(), resource_id))
    }

    /// Get string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LifecycleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Interface for the key-value existence cache
#[async_trait]
pub trait ExistenceCache: Send + Sync {
    /// Does the key exist?
    async fn exists(&self, key: &LifecycleKey) -> Result<bool, CacheError>;
}

/// Errors from the existence cache backend
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Cache backend unavailable: {message}")]
    Unavailable { message: String },
}

impl CacheError {
    /// Cache failures are backend-reachability problems; the request fails
    /// with a retryable acknowledgement rather than guessing at the marker.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Unavailable { .. } => true,
        }
    }
}

/// Outcome of a gate evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// The event may proceed to routing and dispatch
    Allow,

    /// The event is dropped silently: acknowledged as handled, nothing
    /// dispatched. `key` is the marker that was absent, when one could be
    /// built.
    Suppress { key: Option<LifecycleKey> },
}

// ============================================================================
// LifecycleGate
// ============================================================================

/// Gate evaluating whether a lifecycle event may proceed.
///
/// Applies only to topics whose resource kind is in the allow-list
/// ({product, collection}); every other topic passes unconditionally.
/// `create` actions pass too — the create path is what causes the marker to
/// be written downstream. `update` and `delete` pass only when the marker
/// already exists.
pub struct LifecycleGate {
    cache: Arc<dyn ExistenceCache>,
}

impl LifecycleGate {
    /// Create a gate over an existence cache
    pub fn new(cache: Arc<dyn ExistenceCache>) -> Self {
        Self { cache }
    }

    /// Evaluate the gate for an event's topic and resource id
    pub async fn evaluate(
        &self,
        topic: Topic,
        resource_id: Option<&str>,
    ) -> Result<GateDecision, CacheError> {
        let Some(kind) = topic.resource_kind() else {
            return Ok(GateDecision::Allow);
        };

        match topic.action() {
            TopicAction::Create => Ok(GateDecision::Allow),
            TopicAction::Update | TopicAction::Delete => {
                let Some(resource_id) = resource_id else {
                    // No id means no marker to check; the event cannot be
                    // correlated with a known resource.
                    debug!(topic = %topic, "Suppressing lifecycle event without resource id");
                    return Ok(GateDecision::Suppress { key: None });
                };

                let key = LifecycleKey::new(kind, resource_id);
                if self.cache.exists(&key).await? {
                    Ok(GateDecision::Allow)
                } else {
                    Ok(GateDecision::Suppress { key: Some(key) })
                }
            }
            // Unreachable for allow-listed kinds today; harmless if a new
            // action is ever added to a gated resource.
            TopicAction::Publish | TopicAction::Uninstalled => Ok(GateDecision::Allow),
        }
    }
}

impl fmt::Debug for LifecycleGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleGate").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
