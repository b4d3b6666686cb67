use ssf_common::Paise;
use thiserror::Error;

use crate::db_types::Coupon;

#[derive(Debug, Clone, Error)]
pub enum CouponError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Coupon code {0} does not exist")]
    UnknownCode(String),
    #[error("Coupon {0} is not active yet")]
    NotYetActive(String),
    #[error("Coupon {0} has expired")]
    Expired(String),
    #[error("Coupon {code} requires a minimum order value of {minimum}")]
    MinOrderValue { code: String, minimum: Paise },
    #[error("Coupon {0} has reached its usage limit")]
    UsageLimitReached(String),
    #[error("Coupon {0} has already been used by this customer")]
    AlreadyUsed(String),
}

impl From<sqlx::Error> for CouponError {
    fn from(e: sqlx::Error) -> Self {
        CouponError::DatabaseError(e.to_string())
    }
}

/// Coupon storage and usage audit. Validation policy (validity window, minimum order value, usage limits) lives in
/// [`CouponApi`](crate::CouponApi); this trait only answers the storage questions the policy needs.
#[allow(async_fn_in_trait)]
pub trait CouponManagement {
    /// Creates or replaces a coupon. Codes are uppercased before storage.
    async fn upsert_coupon(&self, coupon: Coupon) -> Result<Coupon, CouponError>;

    /// Fetches a coupon by code (case-insensitive). `None` if no such coupon exists.
    async fn fetch_coupon(&self, code: &str) -> Result<Option<Coupon>, CouponError>;

    /// How many times the coupon has been redeemed, across all customers.
    async fn coupon_usage_count(&self, code: &str) -> Result<i64, CouponError>;

    /// Whether this customer has redeemed the coupon before.
    async fn customer_has_used_coupon(&self, code: &str, customer_id: &str) -> Result<bool, CouponError>;
}
