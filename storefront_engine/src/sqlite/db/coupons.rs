use sqlx::SqliteConnection;

use crate::{
    db_types::{Coupon, OrderId},
    traits::CouponError,
};

pub async fn upsert(coupon: Coupon, conn: &mut SqliteConnection) -> Result<Coupon, CouponError> {
    let saved = sqlx::query_as(
        r#"
            INSERT INTO coupons (code, discount_type, value, min_order_value, max_discount, valid_from, valid_until, usage_limit)
            VALUES (UPPER($1), $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (code) DO UPDATE SET
                discount_type = excluded.discount_type,
                value = excluded.value,
                min_order_value = excluded.min_order_value,
                max_discount = excluded.max_discount,
                valid_from = excluded.valid_from,
                valid_until = excluded.valid_until,
                usage_limit = excluded.usage_limit
            RETURNING *;
        "#,
    )
    .bind(&coupon.code)
    .bind(coupon.discount_type)
    .bind(coupon.value)
    .bind(coupon.min_order_value)
    .bind(coupon.max_discount)
    .bind(coupon.valid_from)
    .bind(coupon.valid_until)
    .bind(coupon.usage_limit)
    .fetch_one(conn)
    .await?;
    Ok(saved)
}

pub async fn fetch(code: &str, conn: &mut SqliteConnection) -> Result<Option<Coupon>, sqlx::Error> {
    let coupon =
        sqlx::query_as("SELECT * FROM coupons WHERE code = UPPER($1)").bind(code).fetch_optional(conn).await?;
    Ok(coupon)
}

pub async fn usage_count(code: &str, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM coupon_usage WHERE code = UPPER($1)")
        .bind(code)
        .fetch_one(conn)
        .await?;
    Ok(row.0)
}

pub async fn customer_has_used(code: &str, customer_id: &str, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let row: Option<(i64,)> =
        sqlx::query_as("SELECT 1 FROM coupon_usage WHERE code = UPPER($1) AND customer_id = $2 LIMIT 1")
            .bind(code)
            .bind(customer_id)
            .fetch_optional(conn)
            .await?;
    Ok(row.is_some())
}

pub async fn record_usage(
    code: &str,
    customer_id: &str,
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO coupon_usage (code, customer_id, order_id) VALUES (UPPER($1), $2, $3)")
        .bind(code)
        .bind(customer_id)
        .bind(order_id.as_str())
        .execute(conn)
        .await?;
    Ok(())
}
