use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{SizeCode, StockLevel, StockLogEntry},
    traits::{BulkAdjustOutcome, InventoryError, InventoryManagement, InventorySummary, Page, StockAdjustment, StockHistoryFilter},
};

pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 5;

/// Stock control for the admin surface: adjustments, the ledger, and the low/out-of-stock reports.
pub struct InventoryApi<B> {
    db: B,
}

impl<B> Debug for InventoryApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "InventoryApi")
    }
}

impl<B> InventoryApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> InventoryApi<B>
where B: InventoryManagement
{
    /// Registers a product/size with the ledger, starting at zero units. Idempotent.
    pub async fn register_size(&self, product_id: &str, size: SizeCode) -> Result<(), InventoryError> {
        self.db.register_size(product_id, size).await
    }

    pub async fn stock_level(&self, product_id: &str, size: SizeCode) -> Result<i64, InventoryError> {
        self.db.stock_level(product_id, size).await
    }

    /// Applies a single stock adjustment.
    ///
    /// The quantity must be positive (the direction comes from the entry type). Deductions that would drive the
    /// counter negative fail with `InsufficientStock` and leave both the counter and the ledger untouched. Every
    /// success writes exactly one ledger entry whose previous/new counts bracket the change.
    pub async fn adjust_stock(&self, adjustment: StockAdjustment) -> Result<StockLogEntry, InventoryError> {
        if adjustment.quantity <= 0 {
            return Err(InventoryError::InvalidQuantity(adjustment.quantity));
        }
        let entry = self.db.adjust_stock(adjustment).await?;
        debug!(
            "📦️ Stock {}: {}/{} {} -> {} ({})",
            entry.entry_type, entry.product_id, entry.size, entry.previous_stock, entry.new_stock, entry.reason
        );
        Ok(entry)
    }

    /// Applies each adjustment independently and reports a per-item outcome, in input order. One bad row — an
    /// unknown product, a shortfall — never blocks the rest of the batch.
    pub async fn bulk_adjust(&self, adjustments: Vec<StockAdjustment>, actor: &str) -> Vec<BulkAdjustOutcome> {
        let mut outcomes = Vec::with_capacity(adjustments.len());
        for mut adjustment in adjustments {
            adjustment.actor = actor.to_string();
            let outcome = match self.adjust_stock(adjustment.clone()).await {
                Ok(entry) => BulkAdjustOutcome::succeeded(entry),
                Err(e) => {
                    info!("📦️ Bulk adjustment for {}/{} skipped: {e}", adjustment.product_id, adjustment.size);
                    BulkAdjustOutcome::failed(&adjustment, e.to_string())
                },
            };
            outcomes.push(outcome);
        }
        outcomes
    }

    /// The ledger for one product, newest first.
    pub async fn stock_history(&self, product_id: &str, filter: StockHistoryFilter) -> Result<Page<StockLogEntry>, InventoryError> {
        self.db.stock_history(product_id, filter).await
    }

    /// Sizes that are running out: `0 < quantity <= threshold`.
    pub async fn low_stock(&self, threshold: i64) -> Result<Vec<StockLevel>, InventoryError> {
        self.db.low_stock(threshold).await
    }

    /// Sizes that are gone entirely.
    pub async fn out_of_stock(&self) -> Result<Vec<StockLevel>, InventoryError> {
        self.db.out_of_stock().await
    }

    pub async fn summary(&self, low_stock_threshold: i64) -> Result<InventorySummary, InventoryError> {
        self.db.inventory_summary(low_stock_threshold).await
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}
