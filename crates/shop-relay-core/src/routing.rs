//! Topic-to-job routing table and job builders.
//!
//! Maps a canonical [`InboundEvent`] to zero or more [`JobDescriptor`]s.
//! The mapping is a declarative table keyed by [`Topic`], populated once at
//! startup and verified complete against [`Topic::ALL`] — adding a topic is
//! a data change (a variant plus a table row), never a new conditional
//! scattered across handlers.
//!
//! Builders normalize payload fields into the fixed argument shapes the
//! external worker fleet depends on. A missing optional field always maps to
//! an explicit JSON `null`, never to an omitted key.

use crate::webhook::InboundEvent;
use crate::Topic;
use job_runtime::{JobDescriptor, QueueName, Timestamp, ValidationError as QueueValidationError};
use serde_json::{json, Map, Value};
use std::collections::HashMap;

/// Logical job identifiers consumed by the external worker fleet
pub mod job_types {
    pub const RECONCILE_PRODUCT_IN_OFFERS: &str = "reconcile_product_in_offers";
    pub const MARK_PRODUCT_DELETED: &str = "mark_product_deleted";
    pub const RECONCILE_COLLECTION_IN_OFFERS: &str = "reconcile_collection_in_offers";
    pub const RECORD_ORDER: &str = "record_order";
    pub const RECORD_OFFER_SALE: &str = "record_offer_sale";
    pub const MARK_SHOP_CANCELLED: &str = "mark_shop_cancelled";
    pub const UPDATE_SHOP_PROFILE: &str = "update_shop_profile";
    pub const REFRESH_THEME: &str = "refresh_theme";
}

/// Named destination queues
pub mod queues {
    pub const PRODUCT_PRIORITY: &str = "product-priority";
    pub const LOW_PRIORITY: &str = "low-priority";
    pub const ORDERS: &str = "orders";
    pub const SALE_STATS: &str = "sale-stats";
    pub const THEMES: &str = "themes";
}

/// Delay that lets upstream consistency settle before a job runs
const SETTLE_DELAY_SECS: i64 = 10;

/// The sale-stats job must run strictly after its order job
const SALE_STATS_DELAY_SECS: i64 = 11;

// ============================================================================
// Error Types
// ============================================================================

/// Errors from table construction or job building
#[derive(Debug, thiserror::Error)]
pub enum RoutingError {
    #[error("No job builder registered for topic '{topic}'")]
    MissingBuilder { topic: Topic },

    #[error("Invalid queue name: {0}")]
    InvalidQueue(#[from] QueueValidationError),
}

// ============================================================================
// RoutingTable
// ============================================================================

/// Builder signature: event plus the request's "now" for scheduling
type JobBuilder = fn(&InboundEvent, Timestamp) -> Result<Vec<JobDescriptor>, RoutingError>;

/// Declarative topic-to-builder table
pub struct RoutingTable {
    builders: HashMap<Topic, JobBuilder>,
}

impl RoutingTable {
    /// Build the standard routing table and verify it covers every topic.
    ///
    /// Called once at process start; an incomplete table is a startup error,
    /// not a per-request surprise.
    pub fn standard() -> Result<Self, RoutingError> {
        let mut builders: HashMap<Topic, JobBuilder> = HashMap::new();

        builders.insert(Topic::ProductsCreate, build_product_reconcile);
        builders.insert(Topic::ProductsUpdate, build_product_reconcile);
        builders.insert(Topic::ProductsDelete, build_product_deleted);
        builders.insert(Topic::CollectionsCreate, build_collection_reconcile);
        builders.insert(Topic::CollectionsUpdate, build_collection_reconcile);
        builders.insert(Topic::OrdersCreate, build_order_jobs);
        builders.insert(Topic::AppUninstalled, build_app_uninstalled);
        builders.insert(Topic::ShopUpdate, build_shop_update);
        builders.insert(Topic::ThemePublish, build_theme_refresh);
        builders.insert(Topic::ThemeUpdate, build_theme_refresh);

        let table = Self { builders };
        table.verify_complete()?;
        Ok(table)
    }

    /// Every supported topic must have a builder
    fn verify_complete(&self) -> Result<(), RoutingError> {
        for topic in Topic::ALL {
            if !self.builders.contains_key(&topic) {
                return Err(RoutingError::MissingBuilder { topic });
            }
        }
        Ok(())
    }

    /// Produce the jobs an event calls for
    pub fn build_jobs(
        &self,
        event: &InboundEvent,
        now: Timestamp,
    ) -> Result<Vec<JobDescriptor>, RoutingError> {
        let builder = self
            .builders
            .get(&event.topic)
            .ok_or(RoutingError::MissingBuilder { topic: event.topic })?;
        builder(event, now)
    }
}

impl std::fmt::Debug for RoutingTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoutingTable")
            .field("topics", &self.builders.len())
            .finish()
    }
}

// ============================================================================
// Job Builders
// ============================================================================

fn build_product_reconcile(
    event: &InboundEvent,
    now: Timestamp,
) -> Result<Vec<JobDescriptor>, RoutingError> {
    Ok(vec![JobDescriptor::new(
        job_types::RECONCILE_PRODUCT_IN_OFFERS,
        vec![json!(event.shop_domain.as_str()), resource_id_arg(event)],
        QueueName::new(queues::PRODUCT_PRIORITY)?,
        now,
    )])
}

fn build_product_deleted(
    event: &InboundEvent,
    now: Timestamp,
) -> Result<Vec<JobDescriptor>, RoutingError> {
    Ok(vec![JobDescriptor::new(
        job_types::MARK_PRODUCT_DELETED,
        vec![json!(event.shop_domain.as_str()), resource_id_arg(event)],
        QueueName::new(queues::LOW_PRIORITY)?,
        now,
    )])
}

fn build_collection_reconcile(
    event: &InboundEvent,
    now: Timestamp,
) -> Result<Vec<JobDescriptor>, RoutingError> {
    Ok(vec![JobDescriptor::new(
        job_types::RECONCILE_COLLECTION_IN_OFFERS,
        vec![json!(event.shop_domain.as_str()), resource_id_arg(event)],
        QueueName::new(queues::LOW_PRIORITY)?,
        now,
    )])
}

/// Orders produce one or two jobs: the order record always, plus an
/// offer-attributed sale record when the order carries a cart token. The
/// sale job is scheduled strictly after the order job so the order row
/// exists when the sale is attributed.
fn build_order_jobs(
    event: &InboundEvent,
    now: Timestamp,
) -> Result<Vec<JobDescriptor>, RoutingError> {
    let summary = order_summary(&event.payload);

    let mut jobs = vec![JobDescriptor::new(
        job_types::RECORD_ORDER,
        vec![json!(event.shop_domain.as_str()), summary.clone()],
        QueueName::new(queues::ORDERS)?,
        now.add_seconds(SETTLE_DELAY_SECS),
    )];

    if !field(&event.payload, "cart_token").is_null() {
        jobs.push(JobDescriptor::new(
            job_types::RECORD_OFFER_SALE,
            vec![summary],
            QueueName::new(queues::SALE_STATS)?,
            now.add_seconds(SALE_STATS_DELAY_SECS),
        ));
    }

    Ok(jobs)
}

fn build_app_uninstalled(
    event: &InboundEvent,
    now: Timestamp,
) -> Result<Vec<JobDescriptor>, RoutingError> {
    Ok(vec![JobDescriptor::new(
        job_types::MARK_SHOP_CANCELLED,
        vec![json!(event.shop_domain.as_str())],
        QueueName::new(queues::LOW_PRIORITY)?,
        now.add_seconds(SETTLE_DELAY_SECS),
    )])
}

fn build_shop_update(
    event: &InboundEvent,
    now: Timestamp,
) -> Result<Vec<JobDescriptor>, RoutingError> {
    Ok(vec![JobDescriptor::new(
        job_types::UPDATE_SHOP_PROFILE,
        vec![
            json!(event.shop_domain.as_str()),
            shop_attributes(&event.payload),
        ],
        QueueName::new(queues::LOW_PRIORITY)?,
        now.add_seconds(SETTLE_DELAY_SECS),
    )])
}

fn build_theme_refresh(
    event: &InboundEvent,
    now: Timestamp,
) -> Result<Vec<JobDescriptor>, RoutingError> {
    Ok(vec![JobDescriptor::new(
        job_types::REFRESH_THEME,
        vec![json!(event.shop_domain.as_str())],
        QueueName::new(queues::THEMES)?,
        now.add_seconds(SETTLE_DELAY_SECS),
    )])
}

// ============================================================================
// Payload Normalization
// ============================================================================

/// A payload field, or explicit `null` when absent
fn field(payload: &Map<String, Value>, key: &str) -> Value {
    payload.get(key).cloned().unwrap_or(Value::Null)
}

/// A nested field, or explicit `null` when the parent or child is absent
fn nested_field(payload: &Map<String, Value>, parent: &str, key: &str) -> Value {
    payload
        .get(parent)
        .and_then(|value| value.get(key))
        .cloned()
        .unwrap_or(Value::Null)
}

fn resource_id_arg(event: &InboundEvent) -> Value {
    event
        .resource_id
        .as_deref()
        .map(|id| json!(id))
        .unwrap_or(Value::Null)
}

/// Normalize an order payload into the fixed summary shape the worker fleet
/// consumes.
fn order_summary(payload: &Map<String, Value>) -> Value {
    let line_items = payload
        .get("line_items")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    // Product ids only: nulls dropped, ascending sort.
    let mut items: Vec<i64> = line_items
        .iter()
        .filter_map(|line| line.get("product_id"))
        .filter_map(Value::as_i64)
        .collect();
    items.sort_unstable();

    let item_variants: Vec<Value> = line_items
        .iter()
        .map(|line| {
            json!({
                "variant_id": line.get("variant_id").cloned().unwrap_or(Value::Null),
                "quantity": line.get("quantity").cloned().unwrap_or(Value::Null),
                "price": line.get("price").cloned().unwrap_or(Value::Null),
                "discount": line.get("discount_allocations").cloned().unwrap_or(Value::Null),
            })
        })
        .collect();

    let discount_code = payload
        .get("discount_codes")
        .and_then(Value::as_array)
        .and_then(|codes| codes.first())
        .and_then(|code| code.get("code"))
        .cloned()
        .unwrap_or(Value::Null);

    json!({
        "platform_id": field(payload, "id"),
        "items": items,
        "item_variants": item_variants,
        "discount_code": discount_code,
        "shopper_country": nested_field(payload, "billing_address", "country_code"),
        "referring_site": field(payload, "referring_site"),
        "orders_count": nested_field(payload, "customer", "orders_count"),
        "total": field(payload, "total_price"),
        "cart_token": field(payload, "cart_token"),
    })
}

/// Normalize a shop payload into the fixed attribute set the worker fleet
/// consumes.
fn shop_attributes(payload: &Map<String, Value>) -> Value {
    json!({
        "name": field(payload, "name"),
        "platform_id": field(payload, "id"),
        "email": field(payload, "email"),
        "timezone": field(payload, "timezone"),
        "iana_timezone": field(payload, "iana_timezone"),
        "money_format": field(payload, "money_format"),
        "plan_display_name": field(payload, "plan_display_name"),
        "plan_name": field(payload, "plan_name"),
        "custom_domain": field(payload, "domain"),
        "opened_at": field(payload, "created_at"),
    })
}

#[cfg(test)]
#[path = "routing_tests.rs"]
mod tests;
