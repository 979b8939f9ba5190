//! Alerting sink for authenticity failures.
//!
//! Denied webhooks are reported out-of-band so operators notice a
//! misconfigured secret or an active forgery attempt. The report carries the
//! two HMAC values and the request identity only — never payload contents.

use crate::Topic;
use tracing::warn;

/// Report describing one denied webhook
#[derive(Debug, Clone)]
pub struct AuthenticityAlert {
    /// Topic the request was addressed to
    pub topic: Topic,

    /// Claimed shop domain, when the header was present
    pub shop_domain: Option<String>,

    /// Signature this service computed over the raw body
    pub computed_signature: Option<String>,

    /// Signature received in the request header
    pub received_signature: Option<String>,
}

/// Interface for the alerting backend
pub trait AlertSink: Send + Sync {
    /// Report a denied webhook
    fn webhook_denied(&self, alert: AuthenticityAlert);
}

/// Default sink: emits a structured `WARN` event.
///
/// Deployments with a dedicated alerting backend bind their own
/// [`AlertSink`] at process start instead.
#[derive(Debug, Default)]
pub struct TracingAlertSink;

impl AlertSink for TracingAlertSink {
    fn webhook_denied(&self, alert: AuthenticityAlert) {
        warn!(
            topic = %alert.topic,
            shop_domain = alert.shop_domain.as_deref().unwrap_or("<unknown>"),
            computed = alert.computed_signature.as_deref().unwrap_or("<none>"),
            received = alert.received_signature.as_deref().unwrap_or("<none>"),
            "Denied webhook: signature verification failed"
        );
    }
}
