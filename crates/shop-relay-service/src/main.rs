//! # Shop-Relay Service
//!
//! Binary entry point for the shop_relay HTTP service.
//!
//! This executable:
//! - Loads configuration from files and environment
//! - Initializes structured logging
//! - Builds the concrete queue and cache adapters
//! - Assembles the dispatch pipeline and starts the HTTP server

mod redis_cache;

use job_runtime::{InMemoryJobQueue, JobQueueClient, RedisJobQueue};
use redis_cache::RedisExistenceCache;
use shop_relay_api::{start_server, QueueBackend, ServiceConfig, ServiceError};
use shop_relay_core::{
    ExistenceCache, HmacSignatureVerifier, MemoryExistenceCache, RoutingTable, SigningSecret,
    TracingAlertSink, WebhookPipeline,
};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "shop_relay_service=info,shop_relay_api=info,shop_relay_core=info,\
                 job_runtime=info,tower_http=debug"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Shop-Relay Service");

    // -------------------------------------------------------------------------
    // Load configuration
    //
    // Sources (applied in order — later sources override earlier ones):
    //  1. /etc/shop-relay/service.yaml       — system-wide defaults
    //  2. ./config/service.yaml              — deployment-local override
    //  3. Path given by RELAY_CONFIG_FILE    — operator-specified file
    //  4. Environment variables prefixed RELAY__ (double-underscore
    //     separator), e.g. RELAY__SERVER__PORT=9090 sets server.port
    //
    // All configuration fields carry serde defaults, so absent files or an
    // unconfigured environment produce a valid config. A malformed file or
    // an uncoercible environment variable IS a hard error because it
    // indicates deliberate-but-broken operator configuration.
    //
    // Three platform-conventional variables are honored as fallbacks for
    // deployments that predate the structured config:
    // SHOPIFY_APP_SECRET, REDIS_URL, and CHECK_DUPLICATE_JOBS.
    // -------------------------------------------------------------------------
    let mut config_builder = config::Config::builder()
        .add_source(
            config::File::with_name("/etc/shop-relay/service")
                .required(false)
                .format(config::FileFormat::Yaml),
        )
        .add_source(
            config::File::with_name("config/service")
                .required(false)
                .format(config::FileFormat::Yaml),
        );

    // Optional explicit path supplied by the operator.
    if let Ok(explicit_path) = std::env::var("RELAY_CONFIG_FILE") {
        if !explicit_path.is_empty() {
            config_builder = config_builder.add_source(
                config::File::with_name(&explicit_path)
                    .required(true)
                    .format(config::FileFormat::Yaml),
            );
            info!(path = %explicit_path, "Loading configuration from explicit path");
        }
    }

    let config = match config_builder
        .add_source(config::Environment::with_prefix("RELAY").separator("__"))
        .build()
    {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(error = %e, "Failed to build configuration; aborting");
            std::process::exit(3);
        }
    };

    let mut service_config: ServiceConfig = match config.try_deserialize() {
        Ok(sc) => sc,
        Err(e) => {
            error!(
                error = %e,
                "Could not deserialize service configuration; aborting. \
                 Fix the configuration and restart."
            );
            std::process::exit(3);
        }
    };

    apply_env_fallbacks(&mut service_config);

    if let Err(e) = service_config.validate() {
        error!(error = %e, "Service configuration is invalid; aborting");
        std::process::exit(3);
    }

    // -------------------------------------------------------------------------
    // Build concrete adapters
    //
    // The queue client and the existence cache share the Redis instance the
    // worker fleet runs against; the memory backend exists for development
    // and tests and loses all state on restart.
    // -------------------------------------------------------------------------
    let (queue_client, existence_cache): (Arc<dyn JobQueueClient>, Arc<dyn ExistenceCache>) =
        match service_config.queue.backend {
            QueueBackend::Memory => {
                warn!(
                    "In-memory queue backend is active — jobs and lifecycle markers \
                     do not survive a restart. Not for production."
                );
                (
                    Arc::new(InMemoryJobQueue::new()),
                    Arc::new(MemoryExistenceCache::new()),
                )
            }
            QueueBackend::Redis => {
                // validate() guarantees the connection string is present.
                let connection_string = service_config
                    .queue
                    .connection_string
                    .clone()
                    .unwrap_or_default();

                let queue = match RedisJobQueue::new(&connection_string) {
                    Ok(queue) => queue,
                    Err(e) => {
                        error!(error = %e, "Invalid queue connection string; aborting");
                        std::process::exit(3);
                    }
                };
                let cache = match RedisExistenceCache::new(&connection_string) {
                    Ok(cache) => cache,
                    Err(e) => {
                        error!(error = %e, "Invalid cache connection string; aborting");
                        std::process::exit(3);
                    }
                };

                (Arc::new(queue), Arc::new(cache))
            }
        };

    let routing = match RoutingTable::standard() {
        Ok(routing) => routing,
        Err(e) => {
            error!(error = %e, "Routing table is incomplete; aborting");
            std::process::exit(3);
        }
    };

    // validate() guarantees the secret is present.
    let secret = service_config
        .webhooks
        .signing_secret
        .clone()
        .unwrap_or_default();

    let pipeline = Arc::new(WebhookPipeline::new(
        Arc::new(HmacSignatureVerifier::new(SigningSecret::new(secret))),
        existence_cache,
        queue_client,
        Arc::new(TracingAlertSink),
        routing,
        service_config.webhooks.check_duplicate_jobs,
    ));

    info!(
        host = %service_config.server.host,
        port = service_config.server.port,
        backend = ?service_config.queue.backend,
        check_duplicate_jobs = service_config.webhooks.check_duplicate_jobs,
        "Starting HTTP server"
    );

    if let Err(e) = start_server(service_config, pipeline).await {
        error!("Failed to start server: {}", e);

        let exit_code = match e {
            ServiceError::BindFailed { .. } => 1,
            ServiceError::ServerFailed { .. } => 2,
            ServiceError::Configuration { .. } => 3,
        };

        std::process::exit(exit_code);
    }

    Ok(())
}

// ============================================================================
// Private helpers
// ============================================================================

/// Apply the platform-conventional environment fallbacks.
///
/// Structured configuration wins when present; the flat variables only fill
/// gaps, so deployments configured entirely through them keep working.
fn apply_env_fallbacks(config: &mut ServiceConfig) {
    if config.webhooks.signing_secret.is_none() {
        if let Ok(secret) = std::env::var("SHOPIFY_APP_SECRET") {
            if !secret.is_empty() {
                config.webhooks.signing_secret = Some(secret);
            }
        }
    }

    if config.queue.connection_string.is_none() {
        if let Ok(url) = std::env::var("REDIS_URL") {
            if !url.is_empty() {
                config.queue.connection_string = Some(url);
            }
        }
    }

    if let Ok(toggle) = std::env::var("CHECK_DUPLICATE_JOBS") {
        config.webhooks.check_duplicate_jobs = toggle == "true";
    }
}
