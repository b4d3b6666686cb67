use log::trace;
use sqlx::{QueryBuilder, SqliteConnection};
use ssf_common::Paise;

use crate::{
    db_types::{NewOrder, NewOrderItem, Order, OrderId, OrderItem, OrderStatus, TimelineEntry},
    order_objects::OrderQueryFilter,
    traits::OrderFlowError,
};

/// Inserts the order row. Items, the first timeline entry and any coupon redemption are written by the caller in
/// the same transaction.
pub async fn insert_order(order: &NewOrder, conn: &mut SqliteConnection) -> Result<Order, OrderFlowError> {
    let order_id = order.order_id.clone();
    let inserted = sqlx::query_as(
        r#"
            INSERT INTO orders (
                order_id,
                customer_id,
                customer_email,
                payment_method,
                recipient,
                phone,
                line1,
                line2,
                city,
                state,
                postcode,
                items_total,
                shipping_total,
                tax_total,
                discount,
                grand_total,
                coupon_code
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            RETURNING *;
        "#,
    )
    .bind(order.order_id.as_str())
    .bind(&order.customer_id)
    .bind(&order.customer_email)
    .bind(order.payment_method)
    .bind(&order.shipping.recipient)
    .bind(&order.shipping.phone)
    .bind(&order.shipping.line1)
    .bind(&order.shipping.line2)
    .bind(&order.shipping.city)
    .bind(&order.shipping.state)
    .bind(&order.shipping.postcode)
    .bind(order.pricing.items_total)
    .bind(order.pricing.shipping_total)
    .bind(order.pricing.tax_total)
    .bind(order.pricing.discount)
    .bind(order.pricing.grand_total)
    .bind(&order.coupon_code)
    .fetch_one(conn)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(err) if err.is_unique_violation() => OrderFlowError::OrderAlreadyExists(order_id),
        _ => OrderFlowError::from(e),
    })?;
    Ok(inserted)
}

pub async fn insert_items(
    order_id: &OrderId,
    items: &[NewOrderItem],
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    for item in items {
        sqlx::query(
            r#"
                INSERT INTO order_items (order_id, product_id, name, image, unit_price, quantity, size)
                VALUES ($1, $2, $3, $4, $5, $6, $7);
            "#,
        )
        .bind(order_id.as_str())
        .bind(&item.product_id)
        .bind(&item.name)
        .bind(&item.image)
        .bind(item.unit_price)
        .bind(item.quantity)
        .bind(item.size)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

pub async fn add_timeline_entry(
    order_id: &OrderId,
    status: OrderStatus,
    note: &str,
    actor: &str,
    conn: &mut SqliteConnection,
) -> Result<TimelineEntry, sqlx::Error> {
    let entry = sqlx::query_as(
        r#"
            INSERT INTO order_timeline (order_id, status, note, actor) VALUES ($1, $2, $3, $4)
            RETURNING *;
        "#,
    )
    .bind(order_id.as_str())
    .bind(status)
    .bind(note)
    .bind(actor)
    .fetch_one(conn)
    .await?;
    Ok(entry)
}

/// Returns the orders row for the corresponding `order_id`
pub async fn fetch_order_by_order_id(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order =
        sqlx::query_as("SELECT * FROM orders WHERE order_id = $1").bind(order_id.as_str()).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn fetch_items(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Vec<OrderItem>, sqlx::Error> {
    let items = sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1 ORDER BY id ASC")
        .bind(order_id.as_str())
        .fetch_all(conn)
        .await?;
    Ok(items)
}

pub async fn fetch_timeline(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Vec<TimelineEntry>, sqlx::Error> {
    let entries = sqlx::query_as("SELECT * FROM order_timeline WHERE order_id = $1 ORDER BY id ASC")
        .bind(order_id.as_str())
        .fetch_all(conn)
        .await?;
    Ok(entries)
}

/// Fetches orders according to criteria specified in the `OrderQueryFilter`
///
/// Resulting orders are ordered by `created_at`, newest first
pub async fn search_orders(filter: OrderQueryFilter, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let mut builder = QueryBuilder::new(
        r#"
    SELECT * FROM orders
    "#,
    );
    if !filter.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(customer_id) = filter.customer_id {
        where_clause.push("customer_id = ");
        where_clause.push_bind_unseparated(customer_id);
    }
    if filter.status.as_ref().map(|s| !s.is_empty()).unwrap_or(false) {
        let mut statuses = vec![];
        filter.status.as_ref().unwrap().iter().for_each(|s| {
            statuses.push(format!("'{s}'"));
        });
        let status_clause = statuses.join(",");
        where_clause.push(format!("status IN ({status_clause})"));
    }
    if let Some(method) = filter.payment_method {
        where_clause.push("payment_method = ");
        where_clause.push_bind_unseparated(method.to_string());
    }
    if let Some(email) = filter.email_like {
        where_clause.push("customer_email LIKE ");
        where_clause.push_bind_unseparated(format!("%{email}%"));
    }
    if let Some(since) = filter.since {
        where_clause.push("created_at >= ");
        where_clause.push_bind_unseparated(since);
    }
    if let Some(until) = filter.until {
        where_clause.push("created_at <= ");
        where_clause.push_bind_unseparated(until);
    }
    builder.push(" ORDER BY created_at DESC, id DESC");

    trace!("📝️ Executing query: {}", builder.sql());
    let query = builder.build_query_as::<Order>();
    let orders = query.fetch_all(conn).await?;
    trace!("📝️ Result of search_orders: {:?}", orders.len());
    Ok(orders)
}

/// Moves the order from `from` to `to`. The WHERE clause guards on the current status, so a racing transition
/// leaves exactly one winner; the loser gets `None` back.
pub async fn transition_status(
    order_id: &OrderId,
    from: OrderStatus,
    to: OrderStatus,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let delivered = to == OrderStatus::Delivered;
    let order = sqlx::query_as(
        r#"
            UPDATE orders SET
                status = $1,
                is_delivered = CASE WHEN $2 THEN 1 ELSE is_delivered END,
                delivered_at = CASE WHEN $2 THEN CURRENT_TIMESTAMP ELSE delivered_at END,
                updated_at = CURRENT_TIMESTAMP
            WHERE order_id = $3 AND status = $4
            RETURNING *;
        "#,
    )
    .bind(to)
    .bind(delivered)
    .bind(order_id.as_str())
    .bind(from)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

/// Cancels the order if it is still `Pending` or `Processing`, filling the cancellation block. A paid order starts
/// a refund in status `Pending` for its full grand total.
pub async fn mark_cancelled(
    order_id: &OrderId,
    reason: &str,
    cancelled_by: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders SET
                status = 'Cancelled',
                cancelled_reason = $1,
                cancelled_by = $2,
                cancelled_at = CURRENT_TIMESTAMP,
                refund_status = CASE WHEN is_paid = 1 THEN 'Pending' ELSE NULL END,
                refund_amount = CASE WHEN is_paid = 1 THEN grand_total ELSE NULL END,
                updated_at = CURRENT_TIMESTAMP
            WHERE order_id = $3 AND status IN ('Pending', 'Processing')
            RETURNING *;
        "#,
    )
    .bind(reason)
    .bind(cancelled_by)
    .bind(order_id.as_str())
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

/// Marks the order paid and, if it is still `Pending`, advances it to `Processing` in the same statement.
pub async fn mark_paid(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders SET
                is_paid = 1,
                paid_at = CURRENT_TIMESTAMP,
                status = CASE WHEN status = 'Pending' THEN 'Processing' ELSE status END,
                updated_at = CURRENT_TIMESTAMP
            WHERE order_id = $1
            RETURNING *;
        "#,
    )
    .bind(order_id.as_str())
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

/// Advances a `Pending` COD order to `Processing` without touching the paid flag.
pub async fn advance_cod(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders SET status = 'Processing', updated_at = CURRENT_TIMESTAMP
            WHERE order_id = $1 AND status = 'Pending'
            RETURNING *;
        "#,
    )
    .bind(order_id.as_str())
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

/// Closes out the refund on a cancelled order.
pub async fn complete_refund(
    order_id: &OrderId,
    amount: Paise,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders SET refund_status = 'Completed', refund_amount = $1, updated_at = CURRENT_TIMESTAMP
            WHERE order_id = $2
            RETURNING *;
        "#,
    )
    .bind(amount)
    .bind(order_id.as_str())
    .fetch_optional(conn)
    .await?;
    Ok(order)
}
