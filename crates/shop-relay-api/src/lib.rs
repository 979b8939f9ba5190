//! # Shop-Relay HTTP Service
//!
//! HTTP surface for receiving platform webhooks and running them through the
//! shop_relay dispatch pipeline.
//!
//! This library provides:
//! - One `POST` endpoint per webhook topic, matching the paths the platform
//!   registers (plus the `/themes/*` aliases)
//! - A `GET /health` liveness endpoint
//! - Service configuration with serde defaults
//! - Error-to-status mapping that preserves the platform's retry contract
//!
//! Every topic endpoint responds `200 OK` with an empty body on success —
//! including the suppressed outcomes, which are acknowledgements, not
//! errors.

// Public modules
pub mod errors;

pub use errors::{ServiceError, WebhookHandlerError};

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use shop_relay_core::{
    DispatchSummary, Topic, WebhookHeaders, WebhookPipeline,
};
use std::{collections::HashMap, net::SocketAddr, sync::Arc};
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};

// ============================================================================
// Application State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Configuration for the service
    pub config: ServiceConfig,

    /// The assembled dispatch pipeline
    pub pipeline: Arc<WebhookPipeline>,
}

impl AppState {
    /// Create new application state
    pub fn new(config: ServiceConfig, pipeline: Arc<WebhookPipeline>) -> Self {
        Self { config, pipeline }
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Webhook processing settings
    pub webhooks: WebhookConfig,

    /// Queue backend settings
    pub queue: QueueConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl ServiceConfig {
    /// Validate the assembled configuration.
    ///
    /// Called once at startup; a failure here is an operator error and must
    /// abort the process rather than start a service that rejects every
    /// request.
    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.webhooks.signing_secret.as_deref().unwrap_or("").is_empty() {
            return Err(ServiceError::Configuration {
                message: "webhooks.signing_secret is required (or set SHOPIFY_APP_SECRET)"
                    .to_string(),
            });
        }

        if self.queue.backend == QueueBackend::Redis
            && self.queue.connection_string.as_deref().unwrap_or("").is_empty()
        {
            return Err(ServiceError::Configuration {
                message: "queue.connection_string is required for the redis backend \
                          (or set REDIS_URL)"
                    .to_string(),
            });
        }

        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Webhook processing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// Shared signing secret for the direct-webhook path
    pub signing_secret: Option<String>,

    /// Operator toggle for pending-scan duplicate suppression
    pub check_duplicate_jobs: bool,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            signing_secret: None,
            check_duplicate_jobs: true,
        }
    }
}

/// Queue backend configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Which backend to use
    pub backend: QueueBackend,

    /// Backend connection string (required for redis)
    pub connection_string: Option<String>,
}

/// Available queue backends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueBackend {
    /// In-memory queues; development and tests only
    #[default]
    Memory,

    /// Redis-backed queues shared with the worker fleet
    Redis,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Logging level
    pub level: String,

    /// Enable JSON structured logging
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

// ============================================================================
// HTTP Server
// ============================================================================

/// Create HTTP router with all endpoints.
///
/// The platform registers one URL per topic, so the router carries one route
/// per topic rather than a single generic webhook endpoint. `/themes/*` are
/// aliases the platform has used for the theme topics.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/products/create", post(products_create))
        .route("/products/update", post(products_update))
        .route("/products/delete", post(products_delete))
        .route("/collections/create", post(collections_create))
        .route("/collections/update", post(collections_update))
        .route("/app/uninstalled", post(app_uninstalled))
        .route("/orders/create", post(orders_create))
        .route("/shop/update", post(shop_update))
        .route("/theme/publish", post(theme_publish))
        .route("/theme/update", post(theme_update))
        .route("/themes/publish", post(theme_publish))
        .route("/themes/update", post(theme_update))
        .route("/health", get(handle_health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start HTTP server with graceful shutdown
pub async fn start_server(
    config: ServiceConfig,
    pipeline: Arc<WebhookPipeline>,
) -> Result<(), ServiceError> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| ServiceError::Configuration {
            message: format!("invalid server address: {}", e),
        })?;

    let state = AppState::new(config, pipeline);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ServiceError::BindFailed {
            address: addr.to_string(),
            message: e.to_string(),
        })?;

    info!("Starting HTTP server on {}", addr);

    // Stop accepting new connections on SIGINT/SIGTERM, let in-flight
    // requests run their pipeline to completion.
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ServiceError::ServerFailed {
            message: e.to_string(),
        })?;

    info!("HTTP server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C signal handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C), initiating graceful shutdown");
        },
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        },
    }
}

// ============================================================================
// Webhook Handlers
// ============================================================================

/// Run one webhook request through the pipeline.
///
/// The body is taken as raw [`Bytes`] and handed to the pipeline untouched:
/// the direct path's signature is computed over the exact bytes received,
/// and any re-parse/re-serialize round trip would invalidate it.
#[instrument(skip(state, headers, body), fields(topic = %topic))]
async fn handle_webhook(
    state: AppState,
    topic: Topic,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, WebhookHandlerError> {
    let header_map: HashMap<String, String> = headers
        .iter()
        .map(|(k, v)| {
            (
                k.as_str().to_lowercase(),
                v.to_str().unwrap_or("").to_string(),
            )
        })
        .collect();

    let webhook_headers = WebhookHeaders::from_http_headers(&header_map);

    let summary = state.pipeline.handle(topic, &webhook_headers, &body).await?;

    match &summary {
        DispatchSummary::Dispatched { jobs } => {
            info!(
                dispatched = summary.dispatched_count(),
                candidates = jobs.len(),
                "Webhook handled"
            );
        }
        DispatchSummary::LifecycleSuppressed { .. } => {
            info!("Webhook acknowledged without dispatch (lifecycle gate)");
        }
    }

    // The platform only wants the acknowledgement: 200, empty body.
    Ok(StatusCode::OK)
}

async fn products_create(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, WebhookHandlerError> {
    handle_webhook(state, Topic::ProductsCreate, headers, body).await
}

async fn products_update(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, WebhookHandlerError> {
    handle_webhook(state, Topic::ProductsUpdate, headers, body).await
}

async fn products_delete(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, WebhookHandlerError> {
    handle_webhook(state, Topic::ProductsDelete, headers, body).await
}

async fn collections_create(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, WebhookHandlerError> {
    handle_webhook(state, Topic::CollectionsCreate, headers, body).await
}

async fn collections_update(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, WebhookHandlerError> {
    handle_webhook(state, Topic::CollectionsUpdate, headers, body).await
}

async fn app_uninstalled(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, WebhookHandlerError> {
    handle_webhook(state, Topic::AppUninstalled, headers, body).await
}

async fn orders_create(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, WebhookHandlerError> {
    handle_webhook(state, Topic::OrdersCreate, headers, body).await
}

async fn shop_update(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, WebhookHandlerError> {
    handle_webhook(state, Topic::ShopUpdate, headers, body).await
}

async fn theme_publish(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, WebhookHandlerError> {
    handle_webhook(state, Topic::ThemePublish, headers, body).await
}

async fn theme_update(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, WebhookHandlerError> {
    handle_webhook(state, Topic::ThemeUpdate, headers, body).await
}

// ============================================================================
// Health Check
// ============================================================================

/// Liveness response
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Basic liveness endpoint
async fn handle_health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
