//! # Shop-Relay Core
//!
//! Core business logic for the shop_relay webhook intake and job-dispatch
//! service.
//!
//! This crate contains the domain logic for processing e-commerce platform
//! webhooks: validating signatures, normalizing the two transport envelopes
//! into one canonical event, gating out-of-order lifecycle events, building
//! the jobs each event calls for, and dispatching them to named queues
//! without duplicate work.
//!
//! ## Architecture
//!
//! The core follows clean architecture principles:
//! - Business logic depends only on trait abstractions
//!   ([`SignatureVerifier`], [`ExistenceCache`], [`job_runtime::JobQueueClient`],
//!   [`AlertSink`])
//! - Infrastructure implementations are injected at process start
//! - The pipeline holds no shared mutable state of its own; every request
//!   runs independently against the injected collaborators

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Domain Identifier Types
// ============================================================================

/// Tenant identifier: the shop's platform domain (e.g. `acme.myshopify.com`)
///
/// Required for every downstream job; must be non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShopDomain(String);

impl ShopDomain {
    /// Create new shop domain with validation
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();

        if value.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "shop_domain".to_string(),
            });
        }

        Ok(Self(value))
    }

    /// Get string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShopDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ShopDomain {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Event category: what happened to which kind of resource.
///
/// The supported set is closed. The HTTP surface registers one route per
/// topic, and the routing table is verified at startup to cover every
/// variant, so adding a topic is a data change (variant + table row +
/// route), never a scattered conditional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Topic {
    ProductsCreate,
    ProductsUpdate,
    ProductsDelete,
    CollectionsCreate,
    CollectionsUpdate,
    OrdersCreate,
    AppUninstalled,
    ShopUpdate,
    ThemePublish,
    ThemeUpdate,
}

impl Topic {
    /// Every supported topic, in declaration order
    pub const ALL: [Topic; 10] = [
        Topic::ProductsCreate,
        Topic::ProductsUpdate,
        Topic::ProductsDelete,
        Topic::CollectionsCreate,
        Topic::CollectionsUpdate,
        Topic::OrdersCreate,
        Topic::AppUninstalled,
        Topic::ShopUpdate,
        Topic::ThemePublish,
        Topic::ThemeUpdate,
    ];

    /// Canonical slash-separated topic string as used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProductsCreate => "products/create",
            Self::ProductsUpdate => "products/update",
            Self::ProductsDelete => "products/delete",
            Self::CollectionsCreate => "collections/create",
            Self::CollectionsUpdate => "collections/update",
            Self::OrdersCreate => "orders/create",
            Self::AppUninstalled => "app/uninstalled",
            Self::ShopUpdate => "shop/update",
            Self::ThemePublish => "theme/publish",
            Self::ThemeUpdate => "theme/update",
        }
    }

    /// The lifecycle action carried by the topic's second path segment
    pub fn action(&self) -> TopicAction {
        match self {
            Self::ProductsCreate | Self::CollectionsCreate | Self::OrdersCreate => {
                TopicAction::Create
            }
            Self::ProductsUpdate | Self::CollectionsUpdate | Self::ShopUpdate
            | Self::ThemeUpdate => TopicAction::Update,
            Self::ProductsDelete => TopicAction::Delete,
            Self::AppUninstalled => TopicAction::Uninstalled,
            Self::ThemePublish => TopicAction::Publish,
        }
    }

    /// Resource kind derived from the topic's first path segment, normalized
    /// to singular form.
    ///
    /// Only kinds subject to lifecycle gating are represented; topics outside
    /// the allow-list return `None` and bypass the gate unconditionally.
    pub fn resource_kind(&self) -> Option<ResourceKind> {
        match self {
            Self::ProductsCreate | Self::ProductsUpdate | Self::ProductsDelete => {
                Some(ResourceKind::Product)
            }
            Self::CollectionsCreate | Self::CollectionsUpdate => Some(ResourceKind::Collection),
            _ => None,
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Topic {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|topic| topic.as_str() == s)
            .ok_or_else(|| ValidationError::InvalidFormat {
                field: "topic".to_string(),
                message: format!("unsupported topic '{}'", s),
            })
    }
}

/// Lifecycle action named by a topic's second path segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicAction {
    Create,
    Update,
    Delete,
    Publish,
    Uninstalled,
}

/// Resource kinds subject to lifecycle gating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Product,
    Collection,
}

impl ResourceKind {
    /// Singular form used in lifecycle cache keys
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Product => "product",
            Self::Collection => "collection",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Error type for input validation failures
#[derive(Debug, Clone, thiserror::Error)]
pub enum ValidationError {
    #[error("Field '{field}' is required")]
    Required { field: String },

    #[error("Field '{field}' has invalid format: {message}")]
    InvalidFormat { field: String, message: String },
}

// ============================================================================
// Module declarations
// ============================================================================

/// Transport envelopes and the canonical inbound event
pub mod webhook;

/// Webhook authenticity verification
pub mod signature;

/// Alerting sink for authenticity failures
pub mod alerts;

/// Causal-ordering safeguard for resource lifecycle events
pub mod lifecycle;

/// Advisory duplicate-job suppression
pub mod dedup;

/// Topic-to-job routing table and job builders
pub mod routing;

/// The end-to-end dispatch pipeline
pub mod pipeline;

/// In-memory adapters for tests and development
pub mod adapters;

// Re-export key types for convenience
pub use adapters::MemoryExistenceCache;
pub use alerts::{AlertSink, AuthenticityAlert, TracingAlertSink};
pub use dedup::DuplicateSuppressor;
pub use lifecycle::{CacheError, ExistenceCache, GateDecision, LifecycleGate, LifecycleKey};
pub use pipeline::{DispatchSummary, JobOutcome, WebhookPipeline};
pub use routing::{RoutingError, RoutingTable};
pub use signature::{HmacSignatureVerifier, SignatureError, SignatureVerifier, SigningSecret};
pub use webhook::{InboundEvent, Transport, WebhookEnvelope, WebhookError, WebhookHeaders};

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
