use ssf_common::Paise;
use thiserror::Error;

use crate::{
    db_types::{NewOrder, NewPayment, Order, OrderId, OrderStatus, Payment},
    traits::{CouponError, CouponManagement, GatewayError, InventoryError, InventoryManagement, OrderManagement, OrderQueryError},
};

#[derive(Debug, Clone, Error)]
pub enum OrderFlowError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Cannot insert order, since it already exists with id {0}")]
    OrderAlreadyExists(OrderId),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Not allowed: {0}")]
    Forbidden(String),
    #[error("Invalid order request: {0}")]
    InvalidInput(String),
    #[error("Order status may not change from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
    #[error("{0}")]
    Inventory(#[from] InventoryError),
    #[error("{0}")]
    Coupon(#[from] CouponError),
    #[error("{0}")]
    Query(#[from] OrderQueryError),
}

impl From<sqlx::Error> for OrderFlowError {
    fn from(e: sqlx::Error) -> Self {
        OrderFlowError::DatabaseError(e.to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum PaymentApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("No payment record found for {0}")]
    PaymentNotFound(String),
    #[error("Cannot insert payment, since it already exists for gateway order {0}")]
    PaymentAlreadyExists(String),
    #[error("Refund not allowed: {0}")]
    RefundNotAllowed(String),
    #[error("Invalid refund amount: {0}")]
    InvalidRefundAmount(String),
    #[error("Order {0} is not a cash-on-delivery order")]
    NotACodOrder(OrderId),
    #[error("Order {0} cannot accept a new payment in its current state")]
    OrderNotPayable(OrderId),
    #[error("{0}")]
    Gateway(#[from] GatewayError),
    #[error("{0}")]
    Query(#[from] OrderQueryError),
}

impl From<sqlx::Error> for PaymentApiError {
    fn from(e: sqlx::Error) -> Self {
        PaymentApiError::DatabaseError(e.to_string())
    }
}

/// This trait defines the highest level of behaviour for backends supporting the storefront engine.
///
/// Each method is one atomic storage operation: order placement writes the order, its items, the first timeline
/// entry and any coupon redemption in a single transaction; status changes write the new status and its timeline
/// entry together; payment confirmation updates the payment row and its order together. What is deliberately NOT
/// atomic is the pairing of these operations with stock adjustments — the orchestrator applies those as separate,
/// best-effort steps (see [`OrderFlowApi`](crate::OrderFlowApi)).
#[allow(async_fn_in_trait)]
pub trait StorefrontDatabase: Clone + OrderManagement + InventoryManagement + CouponManagement {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Persists a new order with status `Pending`, its item snapshots, a first timeline entry and, if a coupon code
    /// is attached, the redemption audit row. Fails with `OrderAlreadyExists` for a duplicate order id.
    async fn insert_order(&self, order: NewOrder) -> Result<Order, OrderFlowError>;

    /// Moves an order from `from` to `to` and appends a timeline entry, in one transaction. The update is guarded on
    /// the current status actually being `from`; a concurrent transition loses the race and gets
    /// `InvalidTransition`. Transitioning to `Delivered` also stamps `is_delivered` / `delivered_at`.
    ///
    /// The caller is responsible for consulting [`OrderStatus::can_transition_to`] first; this method only defends
    /// against racing writers.
    async fn update_order_status(
        &self,
        order_id: &OrderId,
        from: OrderStatus,
        to: OrderStatus,
        note: &str,
        actor: &str,
    ) -> Result<Order, OrderFlowError>;

    /// Cancels an order that is still `Pending` or `Processing`: sets the status, fills the cancellation block
    /// (refund status `Pending` iff the order was paid), and appends a timeline entry, in one transaction.
    async fn cancel_order(&self, order_id: &OrderId, reason: &str, cancelled_by: &str, actor: &str) -> Result<Order, OrderFlowError>;

    /// Persists a new `Pending` payment row. Fails with `PaymentAlreadyExists` if a row for the same gateway order
    /// id already exists.
    async fn insert_payment(&self, payment: NewPayment) -> Result<Payment, PaymentApiError>;

    /// Persists a `Pending` COD payment row and advances its order from `Pending` to `Processing` with the given
    /// timeline note, in one transaction. Cash collection happens at delivery, so the order's paid flag is left
    /// untouched.
    async fn insert_cod_payment(&self, payment: NewPayment, note: &str) -> Result<(Payment, Order), PaymentApiError>;

    async fn fetch_payment_by_gateway_order(&self, gateway_order_id: &str) -> Result<Option<Payment>, PaymentApiError>;

    /// All payment attempts for the order, newest first.
    async fn payments_for_order(&self, order_id: &OrderId) -> Result<Vec<Payment>, PaymentApiError>;

    /// The `Success` payment for the order, if one exists. At most one can.
    async fn latest_successful_payment(&self, order_id: &OrderId) -> Result<Option<Payment>, PaymentApiError>;

    /// Marks a payment `Success` (storing the gateway payment id and verified signature, stamping `completed_at`)
    /// and, in the same transaction, marks the order paid and moves it `Pending -> Processing` with a timeline
    /// entry. Only call this after the signature has been verified.
    async fn mark_payment_success(
        &self,
        payment_id: i64,
        gateway_payment_id: &str,
        signature: &str,
    ) -> Result<(Payment, Order), PaymentApiError>;

    /// Records a completed gateway refund: payment status to `Refunded` with the refund sub-record filled in, and
    /// the order's cancellation block advanced to refund status `Completed`, in one transaction.
    async fn record_refund(&self, payment_id: i64, refund_id: &str, amount: Paise, reason: &str) -> Result<Payment, PaymentApiError>;

    /// Records a refund attempt the gateway rejected. The payment keeps its `Success` status; only the refund
    /// sub-record is written, with status `Failed`.
    async fn record_refund_failure(&self, payment_id: i64, amount: Paise, reason: &str) -> Result<Payment, PaymentApiError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), OrderFlowError> {
        Ok(())
    }
}
