use serde::{Deserialize, Serialize};

use crate::db_types::{Order, OrderStatus, Payment};

/// Emitted when a new order has been persisted. Order-confirmation email/SMS hang off this.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPlacedEvent {
    pub order: Order,
}

impl OrderPlacedEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// Emitted when a payment for an order has been verified and the order marked paid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPaidEvent {
    pub order: Order,
    pub payment: Payment,
}

impl OrderPaidEvent {
    pub fn new(order: Order, payment: Payment) -> Self {
        Self { order, payment }
    }
}

/// Emitted when an order has been cancelled, whether by the customer or an admin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCancelledEvent {
    pub order: Order,
}

impl OrderCancelledEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// Emitted on every successful lifecycle transition, carrying the status the order moved away from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderStatusChangedEvent {
    pub old_status: OrderStatus,
    pub order: Order,
}

impl OrderStatusChangedEvent {
    pub fn new(old_status: OrderStatus, order: Order) -> Self {
        Self { old_status, order }
    }
}
