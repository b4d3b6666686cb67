use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db_types::{OrderId, SizeCode, StockEntryType, StockLogEntry};

//--------------------------------------    StockAdjustment    -------------------------------------------------------
/// A request to move one product/size counter by `quantity` units. The quantity is always positive; the direction
/// comes from `entry_type` (see [`StockEntryType::increases_stock`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockAdjustment {
    pub product_id: String,
    pub size: SizeCode,
    pub entry_type: StockEntryType,
    pub quantity: i64,
    pub reason: String,
    pub actor: String,
    pub order_id: Option<OrderId>,
    pub notes: Option<String>,
}

impl StockAdjustment {
    pub fn new(product_id: &str, size: SizeCode, entry_type: StockEntryType, quantity: i64, reason: &str, actor: &str) -> Self {
        Self {
            product_id: product_id.into(),
            size,
            entry_type,
            quantity,
            reason: reason.into(),
            actor: actor.into(),
            order_id: None,
            notes: None,
        }
    }

    pub fn for_order(mut self, order_id: OrderId) -> Self {
        self.order_id = Some(order_id);
        self
    }

    pub fn with_notes(mut self, notes: &str) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

//--------------------------------------   BulkAdjustOutcome   -------------------------------------------------------
/// The per-item result of a bulk stock update. One bad row never fails the batch; callers get an outcome per input,
/// in input order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkAdjustOutcome {
    pub product_id: String,
    pub size: SizeCode,
    pub success: bool,
    pub error: Option<String>,
    pub entry: Option<StockLogEntry>,
}

impl BulkAdjustOutcome {
    pub fn succeeded(entry: StockLogEntry) -> Self {
        Self { product_id: entry.product_id.clone(), size: entry.size, success: true, error: None, entry: Some(entry) }
    }

    pub fn failed(adjustment: &StockAdjustment, error: String) -> Self {
        Self { product_id: adjustment.product_id.clone(), size: adjustment.size, success: false, error: Some(error), entry: None }
    }
}

//--------------------------------------  StockHistoryFilter   -------------------------------------------------------
/// Filter and pagination for stock ledger queries. Results are always newest-first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StockHistoryFilter {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub size: Option<SizeCode>,
    pub entry_type: Option<StockEntryType>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl StockHistoryFilter {
    pub fn with_page(mut self, page: i64, limit: i64) -> Self {
        self.page = Some(page);
        self.limit = Some(limit);
        self
    }

    pub fn with_size(mut self, size: SizeCode) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_entry_type(mut self, entry_type: StockEntryType) -> Self {
        self.entry_type = Some(entry_type);
        self
    }

    pub fn between(mut self, since: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self.until = Some(until);
        self
    }
}

//--------------------------------------         Page          -------------------------------------------------------
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub limit: i64,
    pub total: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, page: i64, limit: i64, total: i64) -> Self {
        Self { items, page, limit, total }
    }
}

//--------------------------------------   InventorySummary    -------------------------------------------------------
/// Catalog-wide stock aggregates for the admin dashboard.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct InventorySummary {
    pub total_units: i64,
    pub products_tracked: i64,
    pub low_stock_count: i64,
    pub out_of_stock_count: i64,
}
