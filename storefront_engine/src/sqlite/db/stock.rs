use log::trace;
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{SizeCode, StockLevel, StockLogEntry},
    traits::{InventoryError, InventorySummary, StockAdjustment, StockHistoryFilter},
};

pub async fn register_size(product_id: &str, size: SizeCode, conn: &mut SqliteConnection) -> Result<(), InventoryError> {
    sqlx::query(
        r#"
            INSERT INTO stock_levels (product_id, size, quantity) VALUES ($1, $2, 0)
            ON CONFLICT (product_id, size) DO NOTHING;
        "#,
    )
    .bind(product_id)
    .bind(size)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn fetch_level(
    product_id: &str,
    size: SizeCode,
    conn: &mut SqliteConnection,
) -> Result<Option<StockLevel>, sqlx::Error> {
    let level = sqlx::query_as("SELECT * FROM stock_levels WHERE product_id = $1 AND size = $2")
        .bind(product_id)
        .bind(size)
        .fetch_optional(conn)
        .await?;
    Ok(level)
}

pub async fn product_tracked(product_id: &str, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM stock_levels WHERE product_id = $1 LIMIT 1")
        .bind(product_id)
        .fetch_optional(conn)
        .await?;
    Ok(row.is_some())
}

/// Adds `quantity` units to the counter, returning the new count, or `None` if the product/size row does not exist.
pub async fn increment(
    product_id: &str,
    size: SizeCode,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<i64>, sqlx::Error> {
    let row: Option<(i64,)> = sqlx::query_as(
        r#"
            UPDATE stock_levels SET quantity = quantity + $1, updated_at = CURRENT_TIMESTAMP
            WHERE product_id = $2 AND size = $3
            RETURNING quantity;
        "#,
    )
    .bind(quantity)
    .bind(product_id)
    .bind(size)
    .fetch_optional(conn)
    .await?;
    Ok(row.map(|r| r.0))
}

/// Removes `quantity` units from the counter, returning the new count. The WHERE clause refuses to go below zero,
/// so two racing deductions serialise correctly: the loser simply matches no row and gets `None`, whether the row
/// is missing or the stock has run out. The caller distinguishes the two cases.
pub async fn guarded_decrement(
    product_id: &str,
    size: SizeCode,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<i64>, sqlx::Error> {
    let row: Option<(i64,)> = sqlx::query_as(
        r#"
            UPDATE stock_levels SET quantity = quantity - $1, updated_at = CURRENT_TIMESTAMP
            WHERE product_id = $2 AND size = $3 AND quantity >= $1
            RETURNING quantity;
        "#,
    )
    .bind(quantity)
    .bind(product_id)
    .bind(size)
    .fetch_optional(conn)
    .await?;
    Ok(row.map(|r| r.0))
}

/// Appends the ledger entry for an adjustment that has already been applied to the counter.
pub async fn append_log(
    adjustment: &StockAdjustment,
    previous_stock: i64,
    new_stock: i64,
    conn: &mut SqliteConnection,
) -> Result<StockLogEntry, InventoryError> {
    let reason = match &adjustment.notes {
        Some(notes) => format!("{} ({notes})", adjustment.reason),
        None => adjustment.reason.clone(),
    };
    let entry = sqlx::query_as(
        r#"
            INSERT INTO stock_log (product_id, size, entry_type, quantity, previous_stock, new_stock, reason, order_id, actor)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *;
        "#,
    )
    .bind(&adjustment.product_id)
    .bind(adjustment.size)
    .bind(adjustment.entry_type)
    .bind(adjustment.quantity)
    .bind(previous_stock)
    .bind(new_stock)
    .bind(reason)
    .bind(adjustment.order_id.as_ref().map(|o| o.as_str().to_string()))
    .bind(&adjustment.actor)
    .fetch_one(conn)
    .await?;
    Ok(entry)
}

/// The ledger for one product, newest first, filtered and paged per the `StockHistoryFilter`.
pub async fn history(
    product_id: &str,
    filter: &StockHistoryFilter,
    conn: &mut SqliteConnection,
) -> Result<Vec<StockLogEntry>, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT * FROM stock_log WHERE product_id = ");
    builder.push_bind(product_id);
    if let Some(size) = filter.size {
        builder.push(" AND size = ");
        builder.push_bind(size);
    }
    if let Some(entry_type) = filter.entry_type {
        builder.push(" AND entry_type = ");
        builder.push_bind(entry_type);
    }
    if let Some(since) = filter.since {
        builder.push(" AND created_at >= ");
        builder.push_bind(since);
    }
    if let Some(until) = filter.until {
        builder.push(" AND created_at <= ");
        builder.push_bind(until);
    }
    builder.push(" ORDER BY id DESC");
    let limit = filter.limit.unwrap_or(50).max(1);
    let page = filter.page.unwrap_or(1).max(1);
    builder.push(" LIMIT ");
    builder.push_bind(limit);
    builder.push(" OFFSET ");
    builder.push_bind((page - 1) * limit);
    trace!("📦️ Executing query: {}", builder.sql());
    let entries = builder.build_query_as::<StockLogEntry>().fetch_all(conn).await?;
    Ok(entries)
}

pub async fn history_count(
    product_id: &str,
    filter: &StockHistoryFilter,
    conn: &mut SqliteConnection,
) -> Result<i64, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM stock_log WHERE product_id = ");
    builder.push_bind(product_id);
    if let Some(size) = filter.size {
        builder.push(" AND size = ");
        builder.push_bind(size);
    }
    if let Some(entry_type) = filter.entry_type {
        builder.push(" AND entry_type = ");
        builder.push_bind(entry_type);
    }
    if let Some(since) = filter.since {
        builder.push(" AND created_at >= ");
        builder.push_bind(since);
    }
    if let Some(until) = filter.until {
        builder.push(" AND created_at <= ");
        builder.push_bind(until);
    }
    let row: (i64,) = builder.build_query_as().fetch_one(conn).await?;
    Ok(row.0)
}

pub async fn low_stock(threshold: i64, conn: &mut SqliteConnection) -> Result<Vec<StockLevel>, sqlx::Error> {
    let levels = sqlx::query_as(
        "SELECT * FROM stock_levels WHERE quantity > 0 AND quantity <= $1 ORDER BY quantity ASC, product_id ASC",
    )
    .bind(threshold)
    .fetch_all(conn)
    .await?;
    Ok(levels)
}

pub async fn out_of_stock(conn: &mut SqliteConnection) -> Result<Vec<StockLevel>, sqlx::Error> {
    let levels =
        sqlx::query_as("SELECT * FROM stock_levels WHERE quantity = 0 ORDER BY product_id ASC").fetch_all(conn).await?;
    Ok(levels)
}

pub async fn summary(low_stock_threshold: i64, conn: &mut SqliteConnection) -> Result<InventorySummary, sqlx::Error> {
    let row: (i64, i64, i64, i64) = sqlx::query_as(
        r#"
            SELECT
                COALESCE(SUM(quantity), 0),
                COUNT(DISTINCT product_id),
                COUNT(CASE WHEN quantity > 0 AND quantity <= $1 THEN 1 END),
                COUNT(CASE WHEN quantity = 0 THEN 1 END)
            FROM stock_levels;
        "#,
    )
    .bind(low_stock_threshold)
    .fetch_one(conn)
    .await?;
    Ok(InventorySummary {
        total_units: row.0,
        products_tracked: row.1,
        low_stock_count: row.2,
        out_of_stock_count: row.3,
    })
}
