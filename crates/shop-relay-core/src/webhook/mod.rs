//! # Webhook Transport Module
//!
//! Normalizes the two supported wire shapes into one canonical
//! [`InboundEvent`] consumed by all downstream pipeline stages.
//!
//! The platform delivers the same logical event over two transports:
//!
//! - **Direct signed webhook** — event fields at the top level of the JSON
//!   body; shop domain and topic carried in HTTP headers; HMAC-SHA256
//!   verification applies (see [`crate::signature`]).
//! - **Relayed envelope** — the body wraps the event in a `detail` object
//!   holding `payload` and `metadata`; the relay infrastructure is trusted
//!   to have set the metadata honestly, so no HMAC check applies.
//!
//! The presence of the `detail` wrapper field is the sole shape
//! discriminant.

use crate::lifecycle::CacheError;
use crate::routing::RoutingError;
use crate::{ResourceKind, ShopDomain, Topic};
use job_runtime::QueueError;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

// ============================================================================
// Core Types
// ============================================================================

/// Platform headers carried on the direct-webhook path.
///
/// Nothing is required at parse time; each transport path enforces the
/// headers it actually needs (the relayed envelope carries its identity in
/// the body, not in headers).
#[derive(Debug, Clone, Default)]
pub struct WebhookHeaders {
    /// `X-Shopify-Hmac-Sha256` — base64 HMAC of the raw body
    pub hmac_signature: Option<String>,

    /// `X-Shopify-Shop-Domain` — tenant identity on the direct path
    pub shop_domain: Option<String>,

    /// `X-Shopify-Topic` — informational; the route determines the topic
    pub topic: Option<String>,
}

impl WebhookHeaders {
    /// Parse headers from a lowercase-keyed HTTP header map
    pub fn from_http_headers(headers: &HashMap<String, String>) -> Self {
        Self {
            hmac_signature: headers.get("x-shopify-hmac-sha256").cloned(),
            shop_domain: headers.get("x-shopify-shop-domain").cloned(),
            topic: headers.get("x-shopify-topic").cloned(),
        }
    }
}

/// Which transport path produced an event.
///
/// Drives which verification path already ran: `DirectWebhook` requests were
/// HMAC-verified by this service, `RelayedEnvelope` requests were
/// authenticated upstream by the relay infrastructure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Transport {
    DirectWebhook,
    RelayedEnvelope,
}

/// Canonical, transport-independent inbound notification.
///
/// Immutable once constructed; created per request and discarded after
/// dispatch or rejection.
#[derive(Debug, Clone)]
pub struct InboundEvent {
    /// Tenant identifier
    pub shop_domain: ShopDomain,

    /// Event category
    pub topic: Topic,

    /// Primary identifier of the affected entity, when derivable
    pub resource_id: Option<String>,

    /// Raw event body (the unwrapped payload on the relayed path)
    pub payload: Map<String, Value>,

    /// Transport path that produced this event
    pub received_via: Transport,
}

// ============================================================================
// Envelope Detection and Normalization
// ============================================================================

/// The detected wire shape, one variant per transport
#[derive(Debug, Clone)]
pub enum WebhookEnvelope {
    /// Direct signed webhook: the body is the event payload itself
    Direct { payload: Map<String, Value> },

    /// Relayed envelope: `detail.payload` plus relay-set `detail.metadata`
    Relayed {
        payload: Map<String, Value>,
        metadata: Map<String, Value>,
    },
}

impl WebhookEnvelope {
    /// Detect which wire shape a parsed body carries.
    ///
    /// The `detail` wrapper field is the sole discriminant. A body carrying
    /// `detail` with a missing or non-object `payload`/`metadata` is
    /// malformed — it cannot be reinterpreted as a direct webhook.
    pub fn detect(body: Value) -> Result<Self, WebhookError> {
        let Value::Object(mut root) = body else {
            return Err(WebhookError::MalformedPayload {
                field: "body".to_string(),
            });
        };

        let Some(detail) = root.remove("detail") else {
            return Ok(Self::Direct { payload: root });
        };

        let Value::Object(mut detail) = detail else {
            return Err(WebhookError::MalformedPayload {
                field: "detail".to_string(),
            });
        };

        let payload = match detail.remove("payload") {
            Some(Value::Object(payload)) => payload,
            _ => {
                return Err(WebhookError::MalformedPayload {
                    field: "detail.payload".to_string(),
                })
            }
        };

        let metadata = match detail.remove("metadata") {
            Some(Value::Object(metadata)) => metadata,
            _ => {
                return Err(WebhookError::MalformedPayload {
                    field: "detail.metadata".to_string(),
                })
            }
        };

        Ok(Self::Relayed { payload, metadata })
    }

    /// Get the transport this envelope arrived over
    pub fn transport(&self) -> Transport {
        match self {
            Self::Direct { .. } => Transport::DirectWebhook,
            Self::Relayed { .. } => Transport::RelayedEnvelope,
        }
    }

    /// Convert the envelope into the canonical event.
    ///
    /// Direct: shop domain comes from the `X-Shopify-Shop-Domain` header and
    /// the resource id from the payload's `id` field. Relayed: shop domain
    /// comes from `detail.metadata` (never from headers), and the resource
    /// id from the kind-specific metadata entry, falling back to the
    /// payload's `id`.
    pub fn into_event(
        self,
        topic: Topic,
        headers: &WebhookHeaders,
    ) -> Result<InboundEvent, WebhookError> {
        match self {
            Self::Direct { payload } => {
                let domain = headers.shop_domain.as_deref().ok_or_else(|| {
                    WebhookError::MalformedPayload {
                        field: "X-Shopify-Shop-Domain".to_string(),
                    }
                })?;
                let shop_domain = ShopDomain::new(domain).map_err(|_| {
                    WebhookError::MalformedPayload {
                        field: "X-Shopify-Shop-Domain".to_string(),
                    }
                })?;
                let resource_id = resource_id_from(payload.get("id"));

                Ok(InboundEvent {
                    shop_domain,
                    topic,
                    resource_id,
                    payload,
                    received_via: Transport::DirectWebhook,
                })
            }
            Self::Relayed { payload, metadata } => {
                let domain = metadata
                    .get("X-Shopify-Shop-Domain")
                    .and_then(Value::as_str)
                    .ok_or_else(|| WebhookError::MalformedPayload {
                        field: "detail.metadata.X-Shopify-Shop-Domain".to_string(),
                    })?;
                let shop_domain = ShopDomain::new(domain).map_err(|_| {
                    WebhookError::MalformedPayload {
                        field: "detail.metadata.X-Shopify-Shop-Domain".to_string(),
                    }
                })?;

                let metadata_key = match topic.resource_kind() {
                    Some(ResourceKind::Product) => Some("X-Shopify-Product-Id"),
                    Some(ResourceKind::Collection) => Some("X-Shopify-Collection-Id"),
                    None => None,
                };
                let resource_id = metadata_key
                    .and_then(|key| resource_id_from(metadata.get(key)))
                    .or_else(|| resource_id_from(payload.get("id")));

                Ok(InboundEvent {
                    shop_domain,
                    topic,
                    resource_id,
                    payload,
                    received_via: Transport::RelayedEnvelope,
                })
            }
        }
    }
}

/// Resource identifiers arrive as JSON numbers or strings depending on the
/// platform's serializer version; both normalize to a string.
fn resource_id_from(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Top-level error for webhook pipeline failures
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("Webhook authentication failed: signature absent or mismatched")]
    Unauthenticated,

    #[error("Malformed payload: required field '{field}' is missing or invalid")]
    MalformedPayload { field: String },

    #[error("JSON parsing failed: {0}")]
    JsonParsing(#[from] serde_json::Error),

    #[error("Existence cache unavailable: {0}")]
    Cache(#[from] CacheError),

    #[error("Queue delivery failed: {0}")]
    Queue(#[from] QueueError),

    #[error("Event routing failed: {0}")]
    Routing(#[from] RoutingError),
}

impl WebhookError {
    /// Check if the failure is transient.
    ///
    /// Transient failures surface as a failed acknowledgement so the sending
    /// platform redelivers; everything else is permanent and must not be
    /// retried upstream.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Unauthenticated => false,
            Self::MalformedPayload { .. } => false,
            Self::JsonParsing(_) => false,
            Self::Cache(e) => e.is_transient(),
            Self::Queue(e) => e.is_transient(),
            Self::Routing(_) => false,
        }
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
