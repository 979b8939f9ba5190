//! End-to-end tests for verification, transport handling, and idempotence.

mod common;

use axum::http::{Request, StatusCode};
use axum::body::Body;
use common::*;
use serde_json::json;

// ============================================================================
// Signature verification
// ============================================================================

/// A signature computed over a modified body must never validate against the
/// original header.
#[tokio::test]
async fn test_modified_body_never_validates() {
    let h = harness();
    let original = br#"{"id": 42, "title": "Widget"}"#;
    let modified = br#"{"id": 42, "title": "Widget", "price": "0.00"}"#;

    let request = Request::builder()
        .method("POST")
        .uri("/products/create")
        .header("X-Shopify-Hmac-Sha256", sign(original))
        .header("X-Shopify-Shop-Domain", "acme.myshopify.com")
        .body(Body::from(modified.to_vec()))
        .unwrap();

    let response = h.send(request).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(h.queue_calls.call_count(), 0);
}

/// A request missing the signature header entirely returns 401 and causes
/// zero cache or queue interaction.
#[tokio::test]
async fn test_missing_signature_has_zero_side_effects() {
    let h = harness();

    let response = h
        .send(unsigned_post("/products/update", br#"{"id": 42}"#))
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_string(response).await, "Not Authorized");
    assert_eq!(h.cache_calls.read_count(), 0, "cache must not be queried");
    assert_eq!(h.queue_calls.call_count(), 0, "queue must not be touched");
}

#[tokio::test]
async fn test_valid_signature_is_accepted() {
    let h = harness();

    let response = h
        .send(signed_post("/products/create", br#"{"id": 42}"#))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "");
    assert_eq!(h.queue.pending_count(&queue_name("product-priority")), 1);
}

// ============================================================================
// Relayed envelope
// ============================================================================

/// The shop domain used downstream equals the metadata value, never a header
/// value.
#[tokio::test]
async fn test_relayed_shop_domain_comes_from_metadata() {
    let h = harness();
    let body = serde_json::to_vec(&json!({
        "detail": {
            "payload": {"id": 42},
            "metadata": {"X-Shopify-Shop-Domain": "metadata-shop.myshopify.com"}
        }
    }))
    .unwrap();

    // Deliberately carry a contradicting header; it must be ignored.
    let request = Request::builder()
        .method("POST")
        .uri("/products/create")
        .header("X-Shopify-Shop-Domain", "header-shop.myshopify.com")
        .body(Body::from(body))
        .unwrap();

    let response = h.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);

    let pending = h.queue.drain(&queue_name("product-priority"));
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].args[0], json!("metadata-shop.myshopify.com"));
}

#[tokio::test]
async fn test_malformed_envelope_returns_400_without_dispatch() {
    let h = harness();
    let body = serde_json::to_vec(&json!({"detail": {"payload": {"id": 1}}})).unwrap();

    let response = h.send(unsigned_post("/products/create", &body)).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(h.queue_calls.call_count(), 0);
}

// ============================================================================
// Idempotence
// ============================================================================

/// Submitting the identical direct webhook twice while suppression is
/// enabled and the first job is still pending dispatches exactly one job.
#[tokio::test]
async fn test_identical_webhook_twice_dispatches_once() {
    let h = harness();
    let body = br#"{"id": 42, "title": "Widget"}"#;

    let first = h.send(signed_post("/products/create", body)).await;
    let second = h.send(signed_post("/products/create", body)).await;

    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(second.status(), StatusCode::OK, "suppression is not an error");
    assert_eq!(h.queue.pending_count(&queue_name("product-priority")), 1);
}

/// With the operator toggle off, every delivery dispatches.
#[tokio::test]
async fn test_suppression_disabled_dispatches_every_delivery() {
    let h = harness_with(false);
    let body = br#"{"id": 42}"#;

    h.send(signed_post("/products/create", body)).await;
    h.send(signed_post("/products/create", body)).await;

    assert_eq!(h.queue.pending_count(&queue_name("product-priority")), 2);
}
