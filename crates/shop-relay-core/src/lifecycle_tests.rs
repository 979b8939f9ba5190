//! Tests for the lifecycle gate.

use super::*;
use crate::adapters::MemoryExistenceCache;
use crate::Topic;

fn gate_with_cache() -> (LifecycleGate, MemoryExistenceCache) {
    let cache = MemoryExistenceCache::new();
    let gate = LifecycleGate::new(Arc::new(cache.clone()));
    (gate, cache)
}

#[test]
fn test_key_format() {
    let key = LifecycleKey::new(ResourceKind::Product, "42");
    assert_eq!(key.as_str(), "product_42");

    let key = LifecycleKey::new(ResourceKind::Collection, "abc");
    assert_eq!(key.as_str(), "collection_abc");
}

#[tokio::test]
async fn test_create_passes_without_marker() {
    let (gate, _cache) = gate_with_cache();

    let decision = gate.evaluate(Topic::ProductsCreate, Some("42")).await.unwrap();
    assert_eq!(decision, GateDecision::Allow);
}

/// An update for a resource whose creation has not been observed is dropped
/// silently, not errored.
#[tokio::test]
async fn test_update_without_marker_is_suppressed() {
    let (gate, _cache) = gate_with_cache();

    let decision = gate.evaluate(Topic::ProductsUpdate, Some("42")).await.unwrap();
    assert_eq!(
        decision,
        GateDecision::Suppress {
            key: Some(LifecycleKey::new(ResourceKind::Product, "42"))
        }
    );
}

/// The gate reads whatever the cache says; once the marker is present the
/// identical update passes.
#[tokio::test]
async fn test_update_with_marker_passes() {
    let (gate, cache) = gate_with_cache();
    cache.insert(&LifecycleKey::new(ResourceKind::Product, "42"));

    let decision = gate.evaluate(Topic::ProductsUpdate, Some("42")).await.unwrap();
    assert_eq!(decision, GateDecision::Allow);
}

#[tokio::test]
async fn test_delete_gated_like_update() {
    let (gate, cache) = gate_with_cache();

    let before = gate.evaluate(Topic::ProductsDelete, Some("7")).await.unwrap();
    assert!(matches!(before, GateDecision::Suppress { .. }));

    cache.insert(&LifecycleKey::new(ResourceKind::Product, "7"));
    let after = gate.evaluate(Topic::ProductsDelete, Some("7")).await.unwrap();
    assert_eq!(after, GateDecision::Allow);
}

#[tokio::test]
async fn test_collections_use_their_own_namespace() {
    let (gate, cache) = gate_with_cache();
    cache.insert(&LifecycleKey::new(ResourceKind::Product, "42"));

    // A product marker must not satisfy a collection update for the same id.
    let decision = gate
        .evaluate(Topic::CollectionsUpdate, Some("42"))
        .await
        .unwrap();
    assert!(matches!(decision, GateDecision::Suppress { .. }));
}

/// Topics outside the allow-list bypass the gate unconditionally.
#[tokio::test]
async fn test_non_gated_topics_bypass() {
    let (gate, _cache) = gate_with_cache();

    for topic in [
        Topic::OrdersCreate,
        Topic::ShopUpdate,
        Topic::ThemePublish,
        Topic::ThemeUpdate,
        Topic::AppUninstalled,
    ] {
        let decision = gate.evaluate(topic, None).await.unwrap();
        assert_eq!(decision, GateDecision::Allow, "topic {} should bypass", topic);
    }
}

#[tokio::test]
async fn test_update_without_resource_id_is_suppressed() {
    let (gate, _cache) = gate_with_cache();

    let decision = gate.evaluate(Topic::ProductsUpdate, None).await.unwrap();
    assert_eq!(decision, GateDecision::Suppress { key: None });
}
