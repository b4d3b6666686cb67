use thiserror::Error;

use crate::{
    db_types::{SizeCode, StockLevel, StockLogEntry},
    traits::{InventorySummary, Page, StockAdjustment, StockHistoryFilter},
};

#[derive(Debug, Clone, Error)]
pub enum InventoryError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Product {0} has no stock records")]
    ProductNotFound(String),
    #[error("Product {product_id} does not stock size {size}")]
    UnknownSize { product_id: String, size: SizeCode },
    #[error("Insufficient stock for {product_id}/{size}: requested {requested}, available {available}")]
    InsufficientStock { product_id: String, size: SizeCode, requested: i64, available: i64 },
    #[error("Stock adjustments require a positive quantity, got {0}")]
    InvalidQuantity(i64),
}

impl From<sqlx::Error> for InventoryError {
    fn from(e: sqlx::Error) -> Self {
        InventoryError::DatabaseError(e.to_string())
    }
}

/// Stock counters and the append-only stock ledger.
///
/// This trait is the only path that mutates a product's per-size counter. Every successful adjustment writes exactly
/// one ledger entry in the same storage transaction as the counter update, so the ledger can always be replayed to
/// the current counter value. Deductions are guarded at the storage layer: a counter can never go below zero, no
/// matter how many adjustments race.
#[allow(async_fn_in_trait)]
pub trait InventoryManagement: Clone {
    /// Creates the stock row for a product/size with a zero count. Idempotent: registering an existing size is a
    /// no-op. Stock is then put into the row via [`adjust_stock`](Self::adjust_stock) with
    /// [`StockEntryType::Add`](crate::db_types::StockEntryType::Add).
    async fn register_size(&self, product_id: &str, size: SizeCode) -> Result<(), InventoryError>;

    /// The current counter for a product/size. Fails with `ProductNotFound` / `UnknownSize` if the row was never
    /// registered.
    async fn stock_level(&self, product_id: &str, size: SizeCode) -> Result<i64, InventoryError>;

    /// Applies one adjustment and appends the matching ledger entry, atomically. On any failure the counter is left
    /// unchanged and nothing is logged.
    async fn adjust_stock(&self, adjustment: StockAdjustment) -> Result<StockLogEntry, InventoryError>;

    /// The ledger for one product, newest entries first.
    async fn stock_history(&self, product_id: &str, filter: StockHistoryFilter) -> Result<Page<StockLogEntry>, InventoryError>;

    /// Every size with `0 < quantity <= threshold`.
    async fn low_stock(&self, threshold: i64) -> Result<Vec<StockLevel>, InventoryError>;

    /// Every size with a quantity of exactly zero.
    async fn out_of_stock(&self) -> Result<Vec<StockLevel>, InventoryError>;

    /// Catalog-wide aggregates: total units on hand, tracked products, low and out-of-stock counts.
    async fn inventory_summary(&self, low_stock_threshold: i64) -> Result<InventorySummary, InventoryError>;
}
