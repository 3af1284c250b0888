//! Draft and published order tables on top of a [`KeyValueStore`].

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::completeness::{awb_issues, check_order};
use crate::domain::{Order, OrderDraft};
use crate::error::{OrderError, StoreError};
use crate::flight_plan::{validate_flow, RouteContext};
use crate::storage::KeyValueStore;

pub const DRAFTS_KEY: &str = "orderDrafts";
pub const PUBLISHED_KEY: &str = "publishedDrafts";

/// Status shown for a listed order. Published orders are new orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    New,
    Draft,
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStatus::New => write!(f, "New"),
            OrderStatus::Draft => write!(f, "Draft"),
        }
    }
}

/// Where an order record lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredOrder {
    Draft(Order),
    Published(Order),
}

impl StoredOrder {
    pub fn order(&self) -> &Order {
        match self {
            StoredOrder::Draft(order) | StoredOrder::Published(order) => order,
        }
    }

    pub fn status(&self) -> OrderStatus {
        match self {
            StoredOrder::Draft(_) => OrderStatus::Draft,
            StoredOrder::Published(_) => OrderStatus::New,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderQuery {
    pub text: Option<String>,
}

/// One line of the order search table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRow {
    pub order_id: String,
    pub awb: String,
    pub supplier: String,
    pub qty_product: String,
    pub origin: String,
    pub destination: String,
    pub lease_start: Option<DateTime<Utc>>,
    pub lease_end: Option<DateTime<Utc>>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    #[serde(skip)]
    pub order: Order,
}

impl OrderRow {
    fn new(order: Order, status: OrderStatus) -> Self {
        let awb = order.details.awb_number();
        let order_id = if order.details.awb_key().is_some() {
            awb.clone()
        } else {
            order.id.clone()
        };
        let qty_product = order
            .products
            .first()
            .map(|p| format!("{} / {}", p.total_quantity, p.name))
            .unwrap_or_default();
        let first_flight = order.flights.first();
        let origin = if order.details.awb_origin.is_empty() {
            first_flight.map(|f| f.origin.clone()).unwrap_or_default()
        } else {
            order.details.awb_origin.clone()
        };
        let destination = if order.details.awb_destination.is_empty() {
            first_flight.map(|f| f.destination.clone()).unwrap_or_default()
        } else {
            order.details.awb_destination.clone()
        };
        Self {
            order_id,
            awb,
            supplier: order.supplier.clone(),
            qty_product,
            origin,
            destination,
            lease_start: order.details.lease.start,
            lease_end: order.details.lease.end,
            status,
            created_at: order.created_at,
            last_updated: order.last_updated.unwrap_or(order.created_at),
            order,
        }
    }

    fn matches(&self, needle: &str) -> bool {
        [
            &self.order_id,
            &self.awb,
            &self.supplier,
            &self.qty_product,
            &self.origin,
            &self.destination,
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(needle))
    }
}

/// Keeps the newest record per AWB number, newest first.
fn dedupe_by_awb(orders: Vec<Order>) -> Vec<Order> {
    let mut newest: HashMap<String, Order> = HashMap::new();
    for order in orders {
        let key = order.details.awb_number();
        match newest.get(&key) {
            Some(existing) if existing.created_at > order.created_at => {}
            _ => {
                newest.insert(key, order);
            }
        }
    }
    let mut unique: Vec<Order> = newest.into_values().collect();
    unique.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    unique
}

/// Finds the record a draft should replace: by id, or by AWB pair when the
/// draft has no id yet.
fn position_of(orders: &[Order], draft: &OrderDraft) -> Option<usize> {
    match &draft.id {
        Some(id) => orders.iter().position(|o| &o.id == id),
        None => orders.iter().position(|o| o.same_awb(&draft.details)),
    }
}

fn upsert(
    orders: &mut Vec<Order>,
    draft: OrderDraft,
    created_hint: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Order {
    let existing = position_of(orders, &draft);
    let (id, created_at) = match existing.map(|idx| &orders[idx]) {
        Some(found) => (found.id.clone(), found.created_at),
        None => (
            draft.id.clone().unwrap_or_else(|| Uuid::new_v4().to_string()),
            created_hint.unwrap_or(now),
        ),
    };

    let mut order = Order::from_draft(draft, id, created_at);
    order.last_updated = Some(now);

    match existing {
        Some(idx) => orders[idx] = order.clone(),
        None => orders.push(order.clone()),
    }
    order
}

pub struct DraftRepository<S> {
    store: S,
}

impl<S: KeyValueStore> DraftRepository<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Reads a table. A missing key is an empty table; unreadable content is
    /// an error. A single stored object is accepted as a one-entry table.
    fn load(&self, key: &str) -> Result<Vec<Order>, StoreError> {
        let Some(raw) = self.store.get(key)? else {
            return Ok(Vec::new());
        };
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        let value: serde_json::Value =
            serde_json::from_str(&raw).map_err(|e| StoreError::Corrupt {
                key: key.to_string(),
                reason: e.to_string(),
            })?;
        let parsed = if value.is_array() {
            serde_json::from_value(value)
        } else {
            serde_json::from_value(value).map(|single: Order| vec![single])
        };
        parsed.map_err(|e| StoreError::Corrupt {
            key: key.to_string(),
            reason: e.to_string(),
        })
    }

    fn store(&mut self, key: &str, orders: &[Order]) -> Result<(), StoreError> {
        let json =
            serde_json::to_string(orders).map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.store.set(key, json)
    }

    pub fn drafts(&self) -> Result<Vec<Order>, StoreError> {
        self.load(DRAFTS_KEY)
    }

    pub fn published(&self) -> Result<Vec<Order>, StoreError> {
        self.load(PUBLISHED_KEY)
    }

    /// Saves a working copy. Incomplete drafts are fine, but the AWB number
    /// must be well formed since it identifies drafts saved without an id.
    pub fn save_draft(&mut self, draft: OrderDraft, now: DateTime<Utc>) -> Result<Order, OrderError> {
        let issues = awb_issues(&draft.details);
        if !issues.is_empty() {
            warn!(awb = %draft.details.awb_number(), "Refusing draft without a valid AWB number");
            return Err(OrderError::MissingAwb);
        }

        let mut drafts = self.drafts()?;
        let order = upsert(&mut drafts, draft, None, now);
        self.store(DRAFTS_KEY, &drafts)?;
        info!(order_id = %order.id, draft_count = drafts.len(), "Draft saved");
        Ok(order)
    }

    /// Publishes an order. The order must be complete and, when
    /// `require_balanced_flow` is set, its flights must balance. The matching
    /// draft is removed.
    pub fn publish(
        &mut self,
        draft: OrderDraft,
        require_balanced_flow: bool,
        now: DateTime<Utc>,
    ) -> Result<Order, OrderError> {
        let issues = check_order(&draft);
        if !issues.is_empty() {
            warn!(issue_count = issues.len(), "Refusing to publish incomplete order");
            return Err(OrderError::Incomplete(issues));
        }

        if require_balanced_flow {
            let ctx = RouteContext::new(
                &draft.products,
                &draft.details.awb_origin,
                &draft.details.awb_destination,
            );
            let report = validate_flow(&ctx, &draft.flights);
            if !report.ok() {
                warn!(violations = ?report.errors(), "Refusing to publish unbalanced flight plan");
                return Err(OrderError::Unbalanced(report.into_violations()));
            }
        }

        let mut drafts = self.drafts()?;
        let mut published = self.published()?;

        let draft_idx = position_of(&drafts, &draft);
        let mut draft = draft;
        let mut created_hint = None;
        if let Some(idx) = draft_idx {
            let saved = drafts.remove(idx);
            if draft.id.is_none() && position_of(&published, &draft).is_none() {
                draft.id = Some(saved.id.clone());
            }
            created_hint = Some(saved.created_at);
        }

        let order = upsert(&mut published, draft, created_hint, now);
        let previous = self.store.get(PUBLISHED_KEY)?;
        self.store(PUBLISHED_KEY, &published)?;
        if draft_idx.is_some() {
            if let Err(e) = self.store(DRAFTS_KEY, &drafts) {
                error!(error = %e, order_id = %order.id, "Draft table not updated; rolling back publish");
                let rollback = previous.unwrap_or_else(|| "[]".to_string());
                if let Err(restore) = self.store.set(PUBLISHED_KEY, rollback) {
                    error!(error = %restore, "Published table could not be restored");
                }
                return Err(e.into());
            }
        }
        info!(order_id = %order.id, "Order published");
        Ok(order)
    }

    pub fn get(&self, id: &str) -> Result<Option<StoredOrder>, StoreError> {
        if let Some(order) = self.published()?.into_iter().find(|o| o.id == id) {
            return Ok(Some(StoredOrder::Published(order)));
        }
        Ok(self
            .drafts()?
            .into_iter()
            .find(|o| o.id == id)
            .map(StoredOrder::Draft))
    }

    /// Published rows first, then drafts; each deduplicated by AWB and newest
    /// first, optionally narrowed by a case-insensitive text search.
    pub fn list(&self, query: &OrderQuery) -> Result<Vec<OrderRow>, StoreError> {
        let published = dedupe_by_awb(self.published()?)
            .into_iter()
            .map(|order| OrderRow::new(order, OrderStatus::New));
        let drafts = dedupe_by_awb(self.drafts()?)
            .into_iter()
            .map(|order| OrderRow::new(order, OrderStatus::Draft));
        let rows: Vec<OrderRow> = published.chain(drafts).collect();

        let needle = query
            .text
            .as_deref()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty());
        let rows = match needle {
            Some(needle) => rows.into_iter().filter(|row| row.matches(&needle)).collect(),
            None => rows,
        };
        debug!(row_count = rows.len(), "Listed orders");
        Ok(rows)
    }
}
