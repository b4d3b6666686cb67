use sqlx::SqliteConnection;
use ssf_common::Paise;

use crate::{
    db_types::{NewPayment, OrderId, Payment},
    traits::PaymentApiError,
};

pub async fn insert(payment: NewPayment, conn: &mut SqliteConnection) -> Result<Payment, PaymentApiError> {
    let gateway_order_id = payment.gateway_order_id.clone().unwrap_or_default();
    let inserted = sqlx::query_as(
        r#"
            INSERT INTO payments (order_id, customer_id, amount, currency, method, gateway, gateway_order_id)
            VALUES ($1, $2, $3, 'INR', $4, $5, $6)
            RETURNING *;
        "#,
    )
    .bind(payment.order_id.as_str())
    .bind(&payment.customer_id)
    .bind(payment.amount)
    .bind(payment.method)
    .bind(&payment.gateway)
    .bind(&payment.gateway_order_id)
    .fetch_one(conn)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(err) if err.is_unique_violation() => {
            PaymentApiError::PaymentAlreadyExists(gateway_order_id)
        },
        _ => PaymentApiError::from(e),
    })?;
    Ok(inserted)
}

pub async fn fetch_by_gateway_order(
    gateway_order_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, sqlx::Error> {
    let payment = sqlx::query_as("SELECT * FROM payments WHERE gateway_order_id = $1")
        .bind(gateway_order_id)
        .fetch_optional(conn)
        .await?;
    Ok(payment)
}

pub async fn fetch_for_order(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Vec<Payment>, sqlx::Error> {
    let payments = sqlx::query_as("SELECT * FROM payments WHERE order_id = $1 ORDER BY id DESC")
        .bind(order_id.as_str())
        .fetch_all(conn)
        .await?;
    Ok(payments)
}

pub async fn latest_success(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Option<Payment>, sqlx::Error> {
    let payment = sqlx::query_as("SELECT * FROM payments WHERE order_id = $1 AND status = 'Success' ORDER BY id DESC LIMIT 1")
        .bind(order_id.as_str())
        .fetch_optional(conn)
        .await?;
    Ok(payment)
}

pub async fn mark_success(
    payment_id: i64,
    gateway_payment_id: &str,
    signature: &str,
    conn: &mut SqliteConnection,
) -> Result<Payment, PaymentApiError> {
    let payment = sqlx::query_as(
        r#"
            UPDATE payments SET
                status = 'Success',
                gateway_payment_id = $1,
                gateway_signature = $2,
                completed_at = CURRENT_TIMESTAMP,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $3
            RETURNING *;
        "#,
    )
    .bind(gateway_payment_id)
    .bind(signature)
    .bind(payment_id)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| PaymentApiError::PaymentNotFound(format!("payment id {payment_id}")))?;
    Ok(payment)
}

/// Flips the payment to `Refunded` and fills the refund sub-record.
pub async fn record_refund(
    payment_id: i64,
    refund_id: &str,
    amount: Paise,
    reason: &str,
    conn: &mut SqliteConnection,
) -> Result<Payment, PaymentApiError> {
    let payment = sqlx::query_as(
        r#"
            UPDATE payments SET
                status = 'Refunded',
                refund_id = $1,
                refund_amount = $2,
                refund_status = 'Completed',
                refund_reason = $3,
                refund_processed_at = CURRENT_TIMESTAMP,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $4 AND status = 'Success'
            RETURNING *;
        "#,
    )
    .bind(refund_id)
    .bind(amount)
    .bind(reason)
    .bind(payment_id)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| PaymentApiError::RefundNotAllowed(format!("payment id {payment_id} is not refundable")))?;
    Ok(payment)
}

/// Records a refund the gateway rejected. The payment keeps its `Success` status.
pub async fn record_refund_failure(
    payment_id: i64,
    amount: Paise,
    reason: &str,
    conn: &mut SqliteConnection,
) -> Result<Payment, PaymentApiError> {
    let payment = sqlx::query_as(
        r#"
            UPDATE payments SET
                refund_amount = $1,
                refund_status = 'Failed',
                refund_reason = $2,
                refund_processed_at = CURRENT_TIMESTAMP,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $3
            RETURNING *;
        "#,
    )
    .bind(amount)
    .bind(reason)
    .bind(payment_id)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| PaymentApiError::PaymentNotFound(format!("payment id {payment_id}")))?;
    Ok(payment)
}
