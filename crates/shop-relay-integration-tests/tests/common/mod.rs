//! Common test utilities for shop-relay integration tests
//!
//! This module provides:
//! - A harness wiring the real router and pipeline over in-memory providers
//! - Counting wrappers around the queue and cache to assert interaction counts
//! - Request builders that sign bodies the way the platform does

use axum::body::{to_bytes, Body};
use axum::http::Request;
use axum::response::Response;
use axum::Router;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use job_runtime::{
    InMemoryJobQueue, JobDescriptor, JobId, JobQueueClient, PendingJob, ProviderKind, QueueError,
    QueueName,
};
use sha2::Sha256;
use shop_relay_core::{
    CacheError, ExistenceCache, HmacSignatureVerifier, LifecycleKey, MemoryExistenceCache,
    RoutingTable, SigningSecret, TracingAlertSink, WebhookPipeline,
};
use shop_relay_api::{create_router, AppState, ServiceConfig, WebhookConfig};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt;

pub const SECRET: &str = "integration-test-secret";

// ============================================================================
// Counting wrappers
// ============================================================================

/// Queue client wrapper that counts every push and pending-list call
pub struct CountingJobQueue {
    inner: InMemoryJobQueue,
    calls: AtomicUsize,
}

impl CountingJobQueue {
    pub fn new(inner: InMemoryJobQueue) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    #[allow(dead_code)]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl JobQueueClient for CountingJobQueue {
    async fn push(&self, job: &JobDescriptor) -> Result<JobId, QueueError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.push(job).await
    }

    async fn list_pending(&self, queue: &QueueName) -> Result<Vec<PendingJob>, QueueError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.list_pending(queue).await
    }

    fn provider_kind(&self) -> ProviderKind {
        self.inner.provider_kind()
    }
}

/// Existence cache wrapper that counts reads
pub struct CountingCache {
    inner: MemoryExistenceCache,
    reads: AtomicUsize,
}

impl CountingCache {
    pub fn new(inner: MemoryExistenceCache) -> Self {
        Self {
            inner,
            reads: AtomicUsize::new(0),
        }
    }

    #[allow(dead_code)]
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ExistenceCache for CountingCache {
    async fn exists(&self, key: &LifecycleKey) -> Result<bool, CacheError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.exists(key).await
    }
}

// ============================================================================
// Harness
// ============================================================================

/// The real router and pipeline over in-memory providers
pub struct TestHarness {
    pub router: Router,
    pub queue: InMemoryJobQueue,
    pub cache: MemoryExistenceCache,
    pub queue_calls: Arc<CountingJobQueue>,
    pub cache_calls: Arc<CountingCache>,
}

/// Build a harness with duplicate suppression enabled
pub fn harness() -> TestHarness {
    harness_with(true)
}

/// Build a harness with an explicit duplicate-suppression toggle
#[allow(dead_code)]
pub fn harness_with(check_duplicate_jobs: bool) -> TestHarness {
    let queue = InMemoryJobQueue::new();
    let cache = MemoryExistenceCache::new();
    let queue_calls = Arc::new(CountingJobQueue::new(queue.clone()));
    let cache_calls = Arc::new(CountingCache::new(cache.clone()));

    let pipeline = WebhookPipeline::new(
        Arc::new(HmacSignatureVerifier::new(SigningSecret::new(SECRET))),
        cache_calls.clone(),
        queue_calls.clone(),
        Arc::new(TracingAlertSink),
        RoutingTable::standard().expect("standard routing table must be complete"),
        check_duplicate_jobs,
    );

    let config = ServiceConfig {
        webhooks: WebhookConfig {
            signing_secret: Some(SECRET.to_string()),
            check_duplicate_jobs,
        },
        ..ServiceConfig::default()
    };

    let router = create_router(AppState::new(config, Arc::new(pipeline)));

    TestHarness {
        router,
        queue,
        cache,
        queue_calls,
        cache_calls,
    }
}

impl TestHarness {
    /// Send one request through the router
    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router must produce a response")
    }
}

// ============================================================================
// Request builders
// ============================================================================

/// Compute the base64 HMAC-SHA256 header value for a body
pub fn sign(body: &[u8]) -> String {
    type HmacSha256 = Hmac<Sha256>;
    let mut mac = HmacSha256::new_from_slice(SECRET.as_bytes()).unwrap();
    mac.update(body);
    BASE64.encode(mac.finalize().into_bytes())
}

/// A direct webhook request with a valid signature
pub fn signed_post(path: &str, body: &[u8]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(path)
        .header("X-Shopify-Hmac-Sha256", sign(body))
        .header("X-Shopify-Shop-Domain", "acme.myshopify.com")
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_vec()))
        .unwrap()
}

/// A request with no signature headers at all
#[allow(dead_code)]
pub fn unsigned_post(path: &str, body: &[u8]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(path)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_vec()))
        .unwrap()
}

#[allow(dead_code)]
pub fn queue_name(name: &str) -> QueueName {
    QueueName::new(name).expect("test queue name must be valid")
}

#[allow(dead_code)]
pub async fn body_string(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
