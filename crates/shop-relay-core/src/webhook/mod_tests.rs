//! Tests for envelope detection and event normalization.

use super::*;
use serde_json::json;

fn direct_headers(domain: &str) -> WebhookHeaders {
    WebhookHeaders {
        hmac_signature: Some("sig".to_string()),
        shop_domain: Some(domain.to_string()),
        topic: None,
    }
}

// ============================================================================
// Shape detection tests
// ============================================================================

mod detect_tests {
    use super::*;

    #[test]
    fn test_body_without_detail_is_direct() {
        let envelope =
            WebhookEnvelope::detect(json!({"id": 42, "title": "Widget"})).unwrap();

        assert_eq!(envelope.transport(), Transport::DirectWebhook);
        match envelope {
            WebhookEnvelope::Direct { payload } => {
                assert_eq!(payload.get("id"), Some(&json!(42)));
            }
            other => panic!("expected direct envelope, got {:?}", other),
        }
    }

    #[test]
    fn test_detail_wrapper_is_relayed() {
        let envelope = WebhookEnvelope::detect(json!({
            "detail": {
                "payload": {"id": 42},
                "metadata": {"X-Shopify-Shop-Domain": "acme.myshopify.com"}
            }
        }))
        .unwrap();

        assert_eq!(envelope.transport(), Transport::RelayedEnvelope);
    }

    #[test]
    fn test_non_object_body_is_malformed() {
        let result = WebhookEnvelope::detect(json!([1, 2, 3]));
        assert!(matches!(
            result,
            Err(WebhookError::MalformedPayload { .. })
        ));
    }

    /// A body carrying `detail` commits to the relayed shape; missing inner
    /// fields are malformed, not reinterpreted as a direct webhook.
    #[test]
    fn test_detail_without_payload_is_malformed() {
        let result = WebhookEnvelope::detect(json!({
            "detail": {"metadata": {"X-Shopify-Shop-Domain": "a.myshopify.com"}}
        }));

        assert!(matches!(
            result,
            Err(WebhookError::MalformedPayload { ref field }) if field == "detail.payload"
        ));
    }

    #[test]
    fn test_detail_without_metadata_is_malformed() {
        let result = WebhookEnvelope::detect(json!({
            "detail": {"payload": {"id": 1}}
        }));

        assert!(matches!(
            result,
            Err(WebhookError::MalformedPayload { ref field }) if field == "detail.metadata"
        ));
    }
}

// ============================================================================
// Normalization tests
// ============================================================================

mod into_event_tests {
    use super::*;

    #[test]
    fn test_direct_event_uses_header_domain_and_payload_id() {
        let envelope = WebhookEnvelope::detect(json!({"id": 42})).unwrap();
        let event = envelope
            .into_event(Topic::ProductsUpdate, &direct_headers("acme.myshopify.com"))
            .unwrap();

        assert_eq!(event.shop_domain.as_str(), "acme.myshopify.com");
        assert_eq!(event.resource_id.as_deref(), Some("42"));
        assert_eq!(event.received_via, Transport::DirectWebhook);
    }

    #[test]
    fn test_direct_event_without_domain_header_is_malformed() {
        let envelope = WebhookEnvelope::detect(json!({"id": 42})).unwrap();
        let result = envelope.into_event(Topic::ProductsUpdate, &WebhookHeaders::default());

        assert!(matches!(
            result,
            Err(WebhookError::MalformedPayload { ref field }) if field == "X-Shopify-Shop-Domain"
        ));
    }

    /// The shop domain used downstream must come from the envelope metadata,
    /// never from a header, on the relayed path.
    #[test]
    fn test_relayed_event_uses_metadata_domain_over_headers() {
        let envelope = WebhookEnvelope::detect(json!({
            "detail": {
                "payload": {"id": 7},
                "metadata": {"X-Shopify-Shop-Domain": "from-metadata.myshopify.com"}
            }
        }))
        .unwrap();

        let event = envelope
            .into_event(
                Topic::ProductsCreate,
                &direct_headers("from-header.myshopify.com"),
            )
            .unwrap();

        assert_eq!(event.shop_domain.as_str(), "from-metadata.myshopify.com");
        assert_eq!(event.received_via, Transport::RelayedEnvelope);
    }

    #[test]
    fn test_relayed_event_prefers_metadata_resource_id() {
        let envelope = WebhookEnvelope::detect(json!({
            "detail": {
                "payload": {"id": 7},
                "metadata": {
                    "X-Shopify-Shop-Domain": "acme.myshopify.com",
                    "X-Shopify-Product-Id": 99
                }
            }
        }))
        .unwrap();

        let event = envelope
            .into_event(Topic::ProductsUpdate, &WebhookHeaders::default())
            .unwrap();

        assert_eq!(event.resource_id.as_deref(), Some("99"));
    }

    #[test]
    fn test_relayed_event_falls_back_to_payload_id() {
        let envelope = WebhookEnvelope::detect(json!({
            "detail": {
                "payload": {"id": 7},
                "metadata": {"X-Shopify-Shop-Domain": "acme.myshopify.com"}
            }
        }))
        .unwrap();

        let event = envelope
            .into_event(Topic::CollectionsUpdate, &WebhookHeaders::default())
            .unwrap();

        assert_eq!(event.resource_id.as_deref(), Some("7"));
    }

    #[test]
    fn test_relayed_event_without_metadata_domain_is_malformed() {
        let envelope = WebhookEnvelope::detect(json!({
            "detail": {"payload": {"id": 7}, "metadata": {}}
        }))
        .unwrap();

        let result = envelope.into_event(Topic::OrdersCreate, &WebhookHeaders::default());
        assert!(matches!(result, Err(WebhookError::MalformedPayload { .. })));
    }

    #[test]
    fn test_string_resource_ids_pass_through() {
        let envelope = WebhookEnvelope::detect(json!({"id": "gid-123"})).unwrap();
        let event = envelope
            .into_event(Topic::ProductsCreate, &direct_headers("a.myshopify.com"))
            .unwrap();

        assert_eq!(event.resource_id.as_deref(), Some("gid-123"));
    }

    #[test]
    fn test_missing_resource_id_is_none() {
        let envelope = WebhookEnvelope::detect(json!({"title": "no id here"})).unwrap();
        let event = envelope
            .into_event(Topic::ShopUpdate, &direct_headers("a.myshopify.com"))
            .unwrap();

        assert_eq!(event.resource_id, None);
    }
}

// ============================================================================
// Header parsing tests
// ============================================================================

mod header_tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_headers_parsed_from_lowercase_map() {
        let mut map = HashMap::new();
        map.insert(
            "x-shopify-hmac-sha256".to_string(),
            "c2lnbmF0dXJl".to_string(),
        );
        map.insert(
            "x-shopify-shop-domain".to_string(),
            "acme.myshopify.com".to_string(),
        );

        let headers = WebhookHeaders::from_http_headers(&map);

        assert_eq!(headers.hmac_signature.as_deref(), Some("c2lnbmF0dXJl"));
        assert_eq!(headers.shop_domain.as_deref(), Some("acme.myshopify.com"));
        assert_eq!(headers.topic, None);
    }
}

// ============================================================================
// Error classification tests
// ============================================================================

mod error_tests {
    use super::*;

    #[test]
    fn test_client_errors_are_permanent() {
        assert!(!WebhookError::Unauthenticated.is_transient());
        assert!(!WebhookError::MalformedPayload {
            field: "x".to_string()
        }
        .is_transient());
    }

    #[test]
    fn test_downstream_failures_are_transient() {
        let cache = WebhookError::Cache(CacheError::Unavailable {
            message: "timeout".to_string(),
        });
        assert!(cache.is_transient());

        let queue = WebhookError::Queue(QueueError::ConnectionFailed {
            message: "refused".to_string(),
        });
        assert!(queue.is_transient());
    }
}
