use thiserror::Error;

use crate::{
    db_types::{Order, OrderId, OrderItem, TimelineEntry},
    order_objects::{FullOrder, OrderQueryFilter},
};

#[derive(Debug, Clone, Error)]
pub enum OrderQueryError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("User error constructing query: {0}")]
    QueryError(String),
}

impl From<sqlx::Error> for OrderQueryError {
    fn from(e: sqlx::Error) -> Self {
        OrderQueryError::DatabaseError(e.to_string())
    }
}

/// Read-only queries over orders. The write paths (placement, transitions, payments) live on
/// [`StorefrontDatabase`](crate::traits::StorefrontDatabase); this trait is what reporting and the customer-facing
/// "my orders" screens run on.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    /// Fetches the order row for the given order id. `None` if no such order exists.
    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, OrderQueryError>;

    /// Fetches the order together with its items and timeline.
    async fn fetch_full_order(&self, order_id: &OrderId) -> Result<Option<FullOrder>, OrderQueryError>;

    async fn fetch_order_items(&self, order_id: &OrderId) -> Result<Vec<OrderItem>, OrderQueryError>;

    /// The order's timeline, oldest entry first.
    async fn fetch_timeline(&self, order_id: &OrderId) -> Result<Vec<TimelineEntry>, OrderQueryError>;

    /// Fetches orders according to criteria specified in the `OrderQueryFilter`, newest first.
    async fn search_orders(&self, filter: OrderQueryFilter) -> Result<Vec<Order>, OrderQueryError>;
}
