//! `SqliteDatabase` is a concrete implementation of a storefront engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`traits`] module.
//!
//! Every multi-row operation runs inside one transaction, and the two writes the business rules care most about —
//! stock counter plus ledger entry, payment success plus order status — are committed together or not at all.
use std::fmt::Debug;

use log::*;
use sqlx::SqlitePool;
use ssf_common::Paise;

use super::db::{coupons, new_pool, orders, payments, stock};
use crate::{
    db_types::{
        Coupon,
        NewOrder,
        NewPayment,
        Order,
        OrderId,
        OrderItem,
        OrderStatus,
        Payment,
        SizeCode,
        StockLevel,
        StockLogEntry,
        TimelineEntry,
    },
    order_objects::{FullOrder, OrderQueryFilter},
    traits::{
        CouponError,
        CouponManagement,
        InventoryError,
        InventoryManagement,
        InventorySummary,
        OrderFlowError,
        OrderManagement,
        OrderQueryError,
        Page,
        PaymentApiError,
        StockAdjustment,
        StockHistoryFilter,
        StorefrontDatabase,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl InventoryManagement for SqliteDatabase {
    async fn register_size(&self, product_id: &str, size: SizeCode) -> Result<(), InventoryError> {
        let mut conn = self.pool.acquire().await?;
        stock::register_size(product_id, size, &mut conn).await
    }

    async fn stock_level(&self, product_id: &str, size: SizeCode) -> Result<i64, InventoryError> {
        let mut conn = self.pool.acquire().await?;
        match stock::fetch_level(product_id, size, &mut conn).await? {
            Some(level) => Ok(level.quantity),
            None => {
                if stock::product_tracked(product_id, &mut conn).await? {
                    Err(InventoryError::UnknownSize { product_id: product_id.to_string(), size })
                } else {
                    Err(InventoryError::ProductNotFound(product_id.to_string()))
                }
            },
        }
    }

    /// The counter update and the ledger entry commit together. Deductions use a guarded UPDATE, so two racing
    /// adjustments against the same size can never take the counter negative; the loser reports
    /// `InsufficientStock` with the count it actually found.
    async fn adjust_stock(&self, adjustment: StockAdjustment) -> Result<StockLogEntry, InventoryError> {
        if adjustment.quantity <= 0 {
            return Err(InventoryError::InvalidQuantity(adjustment.quantity));
        }
        let mut tx = self.pool.begin().await?;
        let increases = adjustment.entry_type.increases_stock();
        let new_stock = if increases {
            stock::increment(&adjustment.product_id, adjustment.size, adjustment.quantity, &mut tx).await?
        } else {
            stock::guarded_decrement(&adjustment.product_id, adjustment.size, adjustment.quantity, &mut tx).await?
        };
        let new_stock = match new_stock {
            Some(quantity) => quantity,
            None => {
                let current = stock::fetch_level(&adjustment.product_id, adjustment.size, &mut tx).await?;
                return Err(match current {
                    Some(level) => InventoryError::InsufficientStock {
                        product_id: adjustment.product_id,
                        size: adjustment.size,
                        requested: adjustment.quantity,
                        available: level.quantity,
                    },
                    None => {
                        if stock::product_tracked(&adjustment.product_id, &mut tx).await? {
                            InventoryError::UnknownSize { product_id: adjustment.product_id, size: adjustment.size }
                        } else {
                            InventoryError::ProductNotFound(adjustment.product_id)
                        }
                    },
                });
            },
        };
        let previous_stock = if increases { new_stock - adjustment.quantity } else { new_stock + adjustment.quantity };
        let entry = stock::append_log(&adjustment, previous_stock, new_stock, &mut tx).await?;
        tx.commit().await?;
        trace!("🗃️ Stock for {}/{} is now {} (entry #{})", entry.product_id, entry.size, entry.new_stock, entry.id);
        Ok(entry)
    }

    async fn stock_history(&self, product_id: &str, filter: StockHistoryFilter) -> Result<Page<StockLogEntry>, InventoryError> {
        let mut conn = self.pool.acquire().await?;
        let entries = stock::history(product_id, &filter, &mut conn).await?;
        let total = stock::history_count(product_id, &filter, &mut conn).await?;
        let page = filter.page.unwrap_or(1).max(1);
        let limit = filter.limit.unwrap_or(50).max(1);
        Ok(Page::new(entries, page, limit, total))
    }

    async fn low_stock(&self, threshold: i64) -> Result<Vec<StockLevel>, InventoryError> {
        let mut conn = self.pool.acquire().await?;
        Ok(stock::low_stock(threshold, &mut conn).await?)
    }

    async fn out_of_stock(&self) -> Result<Vec<StockLevel>, InventoryError> {
        let mut conn = self.pool.acquire().await?;
        Ok(stock::out_of_stock(&mut conn).await?)
    }

    async fn inventory_summary(&self, low_stock_threshold: i64) -> Result<InventorySummary, InventoryError> {
        let mut conn = self.pool.acquire().await?;
        Ok(stock::summary(low_stock_threshold, &mut conn).await?)
    }
}

impl OrderManagement for SqliteDatabase {
    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, OrderQueryError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order_by_order_id(order_id, &mut conn).await?)
    }

    async fn fetch_full_order(&self, order_id: &OrderId) -> Result<Option<FullOrder>, OrderQueryError> {
        let mut conn = self.pool.acquire().await?;
        let Some(order) = orders::fetch_order_by_order_id(order_id, &mut conn).await? else {
            return Ok(None);
        };
        let items = orders::fetch_items(order_id, &mut conn).await?;
        let timeline = orders::fetch_timeline(order_id, &mut conn).await?;
        Ok(Some(FullOrder { order, items, timeline }))
    }

    async fn fetch_order_items(&self, order_id: &OrderId) -> Result<Vec<OrderItem>, OrderQueryError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_items(order_id, &mut conn).await?)
    }

    async fn fetch_timeline(&self, order_id: &OrderId) -> Result<Vec<TimelineEntry>, OrderQueryError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_timeline(order_id, &mut conn).await?)
    }

    async fn search_orders(&self, filter: OrderQueryFilter) -> Result<Vec<Order>, OrderQueryError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::search_orders(filter, &mut conn).await?)
    }
}

impl CouponManagement for SqliteDatabase {
    async fn upsert_coupon(&self, coupon: Coupon) -> Result<Coupon, CouponError> {
        let mut conn = self.pool.acquire().await?;
        coupons::upsert(coupon, &mut conn).await
    }

    async fn fetch_coupon(&self, code: &str) -> Result<Option<Coupon>, CouponError> {
        let mut conn = self.pool.acquire().await?;
        Ok(coupons::fetch(code, &mut conn).await?)
    }

    async fn coupon_usage_count(&self, code: &str) -> Result<i64, CouponError> {
        let mut conn = self.pool.acquire().await?;
        Ok(coupons::usage_count(code, &mut conn).await?)
    }

    async fn customer_has_used_coupon(&self, code: &str, customer_id: &str) -> Result<bool, CouponError> {
        let mut conn = self.pool.acquire().await?;
        Ok(coupons::customer_has_used(code, customer_id, &mut conn).await?)
    }
}

impl StorefrontDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_order(&self, order: NewOrder) -> Result<Order, OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        let inserted = orders::insert_order(&order, &mut tx).await?;
        orders::insert_items(&inserted.order_id, &order.items, &mut tx).await?;
        orders::add_timeline_entry(
            &inserted.order_id,
            OrderStatus::Pending,
            "Order placed successfully",
            &order.customer_id,
            &mut tx,
        )
        .await?;
        if let Some(code) = &order.coupon_code {
            coupons::record_usage(code, &order.customer_id, &inserted.order_id, &mut tx).await?;
        }
        tx.commit().await?;
        debug!("🗃️ Order {} has been saved in the DB with id {}", inserted.order_id, inserted.id);
        Ok(inserted)
    }

    async fn update_order_status(
        &self,
        order_id: &OrderId,
        from: OrderStatus,
        to: OrderStatus,
        note: &str,
        actor: &str,
    ) -> Result<Order, OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        let updated = orders::transition_status(order_id, from, to, &mut tx).await?;
        let updated = match updated {
            Some(order) => order,
            None => {
                // either the order is gone, or someone else transitioned it first
                return match orders::fetch_order_by_order_id(order_id, &mut tx).await? {
                    Some(current) => Err(OrderFlowError::InvalidTransition { from: current.status, to }),
                    None => Err(OrderFlowError::OrderNotFound(order_id.clone())),
                };
            },
        };
        orders::add_timeline_entry(order_id, to, note, actor, &mut tx).await?;
        tx.commit().await?;
        trace!("🗃️ Order {order_id} status persisted as {to}");
        Ok(updated)
    }

    async fn cancel_order(&self, order_id: &OrderId, reason: &str, cancelled_by: &str, actor: &str) -> Result<Order, OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        let cancelled = orders::mark_cancelled(order_id, reason, cancelled_by, &mut tx).await?;
        let cancelled = match cancelled {
            Some(order) => order,
            None => {
                return match orders::fetch_order_by_order_id(order_id, &mut tx).await? {
                    Some(current) => {
                        Err(OrderFlowError::InvalidTransition { from: current.status, to: OrderStatus::Cancelled })
                    },
                    None => Err(OrderFlowError::OrderNotFound(order_id.clone())),
                };
            },
        };
        let note = format!("Order cancelled: {reason}");
        orders::add_timeline_entry(order_id, OrderStatus::Cancelled, &note, actor, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order {order_id} cancellation persisted");
        Ok(cancelled)
    }

    async fn insert_payment(&self, payment: NewPayment) -> Result<Payment, PaymentApiError> {
        let mut conn = self.pool.acquire().await?;
        let payment = payments::insert(payment, &mut conn).await?;
        debug!("🗃️ Payment #{} opened for order {}", payment.id, payment.order_id);
        Ok(payment)
    }

    async fn insert_cod_payment(&self, payment: NewPayment, note: &str) -> Result<(Payment, Order), PaymentApiError> {
        let order_id = payment.order_id.clone();
        let customer_id = payment.customer_id.clone();
        let mut tx = self.pool.begin().await?;
        let payment = payments::insert(payment, &mut tx).await?;
        let order = orders::advance_cod(&order_id, &mut tx).await?;
        let order = match order {
            Some(order) => order,
            None => {
                return match orders::fetch_order_by_order_id(&order_id, &mut tx).await? {
                    Some(_) => Err(PaymentApiError::OrderNotPayable(order_id)),
                    None => Err(PaymentApiError::OrderNotFound(order_id)),
                };
            },
        };
        orders::add_timeline_entry(&order_id, order.status, note, &customer_id, &mut tx)
            .await
            .map_err(|e| PaymentApiError::DatabaseError(e.to_string()))?;
        tx.commit().await?;
        debug!("🗃️ COD payment #{} persisted; order {order_id} is {}", payment.id, order.status);
        Ok((payment, order))
    }

    async fn fetch_payment_by_gateway_order(&self, gateway_order_id: &str) -> Result<Option<Payment>, PaymentApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(payments::fetch_by_gateway_order(gateway_order_id, &mut conn).await?)
    }

    async fn payments_for_order(&self, order_id: &OrderId) -> Result<Vec<Payment>, PaymentApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(payments::fetch_for_order(order_id, &mut conn).await?)
    }

    async fn latest_successful_payment(&self, order_id: &OrderId) -> Result<Option<Payment>, PaymentApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(payments::latest_success(order_id, &mut conn).await?)
    }

    async fn mark_payment_success(
        &self,
        payment_id: i64,
        gateway_payment_id: &str,
        signature: &str,
    ) -> Result<(Payment, Order), PaymentApiError> {
        let mut tx = self.pool.begin().await?;
        let payment = payments::mark_success(payment_id, gateway_payment_id, signature, &mut tx).await?;
        let order = orders::mark_paid(&payment.order_id, &mut tx)
            .await?
            .ok_or_else(|| PaymentApiError::OrderNotFound(payment.order_id.clone()))?;
        orders::add_timeline_entry(&order.order_id, order.status, "Payment confirmed", &payment.customer_id, &mut tx)
            .await
            .map_err(|e| PaymentApiError::DatabaseError(e.to_string()))?;
        tx.commit().await?;
        debug!("🗃️ Payment #{payment_id} success persisted; order {} is {}", order.order_id, order.status);
        Ok((payment, order))
    }

    async fn record_refund(&self, payment_id: i64, refund_id: &str, amount: Paise, reason: &str) -> Result<Payment, PaymentApiError> {
        let mut tx = self.pool.begin().await?;
        let payment = payments::record_refund(payment_id, refund_id, amount, reason, &mut tx).await?;
        orders::complete_refund(&payment.order_id, amount, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Refund {refund_id} persisted for order {}", payment.order_id);
        Ok(payment)
    }

    async fn record_refund_failure(&self, payment_id: i64, amount: Paise, reason: &str) -> Result<Payment, PaymentApiError> {
        let mut conn = self.pool.acquire().await?;
        payments::record_refund_failure(payment_id, amount, reason, &mut conn).await
    }

    async fn close(&mut self) -> Result<(), OrderFlowError> {
        self.pool.close().await;
        Ok(())
    }
}
