use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{NewOrder, Order, OrderId, OrderStatus, StockEntryType},
    events::{EventProducers, OrderCancelledEvent, OrderPlacedEvent, OrderStatusChangedEvent},
    order_objects::{FullOrder, OrderQueryFilter},
    sfe_api::CouponApi,
    traits::{InventoryError, InventoryManagement, OrderFlowError, OrderManagement, StockAdjustment, StorefrontDatabase},
};

/// `OrderFlowApi` is the primary API for placing orders and driving them through the lifecycle state machine. It
/// owns the cross-component choreography: stock sufficiency checks against the ledger, coupon validation, the
/// best-effort stock reservation/restoration that brackets an order's life, and the events that notification
/// delivery hangs off.
pub struct OrderFlowApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> OrderFlowApi<B>
where B: StorefrontDatabase
{
    /// Places a new order.
    ///
    /// The sequence is:
    /// 1. Validate the request (at least one item, positive quantities) and the coupon, if one is attached.
    /// 2. Check the stock ledger for every sized item; a shortfall fails the whole order with `InsufficientStock`
    ///    naming the product and size.
    /// 3. Persist the order (status `Pending`, first timeline entry, coupon redemption) atomically.
    /// 4. Reserve stock: one `Order`-typed ledger adjustment per sized item. This step is deliberately best-effort:
    ///    the order has already been committed, so an adjustment failure (say, a racing order taking the last unit
    ///    between the check and the reservation) is logged for ops follow-up and does NOT roll the order back.
    ///
    /// The order is never marked paid here, not even for prepaid payment methods. Only a verified gateway callback
    /// (or COD collection at delivery) may set the paid flag.
    pub async fn place_order(&self, order: NewOrder) -> Result<Order, OrderFlowError> {
        validate_new_order(&order)?;
        if let Some(code) = &order.coupon_code {
            let coupons = CouponApi::new(self.db.clone());
            let discount = coupons.validate(code, &order.customer_id, order.pricing.items_total).await?;
            trace!("🛒️ Coupon {code} grants {discount} on order {}", order.order_id);
        }
        for item in order.items.iter() {
            let Some(size) = item.size else { continue };
            let available = self.db.stock_level(&item.product_id, size).await?;
            if available < item.quantity {
                info!(
                    "🛒️ Order {} rejected: {}/{size} has {available} units, {} requested",
                    order.order_id, item.product_id, item.quantity
                );
                return Err(InventoryError::InsufficientStock {
                    product_id: item.product_id.clone(),
                    size,
                    requested: item.quantity,
                    available,
                }
                .into());
            }
        }
        let placed = self.db.insert_order(order.clone()).await?;
        debug!("🛒️ Order {} placed for customer {}", placed.order_id, placed.customer_id);
        for item in order.items.iter() {
            let Some(size) = item.size else { continue };
            let adjustment = StockAdjustment::new(
                &item.product_id,
                size,
                StockEntryType::Order,
                item.quantity,
                &format!("Stock reduced for order {}", placed.order_id),
                &placed.customer_id,
            )
            .for_order(placed.order_id.clone());
            if let Err(e) = self.db.adjust_stock(adjustment).await {
                warn!("🛒️ Could not reserve stock for {}/{size} on order {}: {e}", item.product_id, placed.order_id);
            }
        }
        self.call_order_placed_hook(&placed).await;
        Ok(placed)
    }

    /// Moves an order to `new_status`, appending a timeline entry.
    ///
    /// The full transition table lives on [`OrderStatus::can_transition_to`]; anything it rejects — including any
    /// attempt to move a `Cancelled` or `Delivered` order — fails with `InvalidTransition` and changes nothing.
    /// A transition to `Delivered` also stamps the delivery flag and timestamp.
    pub async fn update_order_status(
        &self,
        order_id: &OrderId,
        new_status: OrderStatus,
        note: &str,
        actor: &str,
    ) -> Result<Order, OrderFlowError> {
        let order =
            self.db.fetch_order(order_id).await?.ok_or_else(|| OrderFlowError::OrderNotFound(order_id.clone()))?;
        let old_status = order.status;
        if !old_status.can_transition_to(new_status) {
            return Err(OrderFlowError::InvalidTransition { from: old_status, to: new_status });
        }
        let updated = self.db.update_order_status(order_id, old_status, new_status, note, actor).await?;
        debug!("🛒️ Order {order_id} moved {old_status} -> {new_status}");
        self.call_status_changed_hook(old_status, &updated).await;
        Ok(updated)
    }

    /// Cancels an order that has not shipped yet.
    ///
    /// Only `Pending` and `Processing` orders are cancellable. The cancellation itself (status, cancellation block,
    /// timeline entry) commits first; stock restoration then runs per sized item as `Cancellation`-typed ledger
    /// adjustments, best-effort and logged on failure, mirroring the reservation policy in
    /// [`place_order`](Self::place_order). If the order was already paid, the cancellation block starts a refund
    /// with status `Pending`; the actual gateway refund is a separate [`PaymentsApi`](crate::PaymentsApi) call.
    pub async fn cancel_order(
        &self,
        order_id: &OrderId,
        reason: &str,
        cancelled_by: &str,
        actor: &str,
    ) -> Result<Order, OrderFlowError> {
        let order =
            self.db.fetch_order(order_id).await?.ok_or_else(|| OrderFlowError::OrderNotFound(order_id.clone()))?;
        if !order.status.is_cancellable() {
            return Err(OrderFlowError::InvalidTransition { from: order.status, to: OrderStatus::Cancelled });
        }
        let items = self.db.fetch_order_items(order_id).await?;
        let cancelled = self.db.cancel_order(order_id, reason, cancelled_by, actor).await?;
        info!("🛒️ Order {order_id} cancelled by {cancelled_by}: {reason}");
        for item in items.iter() {
            let Some(size) = item.size else { continue };
            let adjustment = StockAdjustment::new(
                &item.product_id,
                size,
                StockEntryType::Cancellation,
                item.quantity,
                &format!("Stock restored for cancelled order {order_id}"),
                actor,
            )
            .for_order(order_id.clone());
            if let Err(e) = self.db.adjust_stock(adjustment).await {
                warn!("🛒️ Could not restore stock for {}/{size} on order {order_id}: {e}", item.product_id);
            }
        }
        self.call_order_cancelled_hook(&cancelled).await;
        Ok(cancelled)
    }

    /// Fetches the full order aggregate on behalf of `viewer`. Customers may only see their own orders; admins may
    /// see any.
    pub async fn order_for_viewer(&self, order_id: &OrderId, viewer: &str, is_admin: bool) -> Result<FullOrder, OrderFlowError> {
        let full =
            self.db.fetch_full_order(order_id).await?.ok_or_else(|| OrderFlowError::OrderNotFound(order_id.clone()))?;
        if !is_admin && full.order.customer_id != viewer {
            debug!("🛒️ {viewer} may not view order {order_id}");
            return Err(OrderFlowError::Forbidden(format!("Order {order_id} belongs to another customer")));
        }
        Ok(full)
    }

    /// Admin search across all orders.
    pub async fn search_orders(&self, filter: OrderQueryFilter) -> Result<Vec<Order>, OrderFlowError> {
        trace!("🛒️ Searching orders: {filter}");
        Ok(self.db.search_orders(filter).await?)
    }

    /// A customer's own orders, with optional extra filters.
    pub async fn orders_for_customer(&self, customer_id: &str, filter: OrderQueryFilter) -> Result<Vec<Order>, OrderFlowError> {
        let filter = filter.with_customer_id(customer_id);
        Ok(self.db.search_orders(filter).await?)
    }

    async fn call_order_placed_hook(&self, order: &Order) {
        for emitter in &self.producers.order_placed_producer {
            let event = OrderPlacedEvent::new(order.clone());
            emitter.publish_event(event).await;
        }
    }

    async fn call_status_changed_hook(&self, old_status: OrderStatus, order: &Order) {
        for emitter in &self.producers.status_changed_producer {
            let event = OrderStatusChangedEvent::new(old_status, order.clone());
            emitter.publish_event(event).await;
        }
    }

    async fn call_order_cancelled_hook(&self, order: &Order) {
        for emitter in &self.producers.order_cancelled_producer {
            let event = OrderCancelledEvent::new(order.clone());
            emitter.publish_event(event).await;
        }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }
}

fn validate_new_order(order: &NewOrder) -> Result<(), OrderFlowError> {
    if order.items.is_empty() {
        return Err(OrderFlowError::InvalidInput("An order must contain at least one item".into()));
    }
    if let Some(item) = order.items.iter().find(|i| i.quantity <= 0) {
        return Err(OrderFlowError::InvalidInput(format!(
            "Item {} has a non-positive quantity ({})",
            item.product_id, item.quantity
        )));
    }
    Ok(())
}
