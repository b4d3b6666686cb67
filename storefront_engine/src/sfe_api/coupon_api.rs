use std::fmt::Debug;

use chrono::Utc;
use log::*;
use ssf_common::Paise;

use crate::{
    db_types::Coupon,
    traits::{CouponError, CouponManagement},
};

/// Coupon policy: whether a given customer may redeem a given code against a given order value, and what discount
/// that grants. Redemption itself is recorded by order placement, in the same transaction as the order insert.
pub struct CouponApi<B> {
    db: B,
}

impl<B> Debug for CouponApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CouponApi")
    }
}

impl<B> CouponApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> CouponApi<B>
where B: CouponManagement
{
    /// Creates or replaces a coupon (admin surface).
    pub async fn upsert_coupon(&self, coupon: Coupon) -> Result<Coupon, CouponError> {
        let coupon = self.db.upsert_coupon(coupon).await?;
        debug!("🎟️ Coupon {} saved ({} {})", coupon.code, coupon.discount_type, coupon.value);
        Ok(coupon)
    }

    /// Checks every redemption rule for `code` and returns the discount it would grant on `order_value`.
    ///
    /// The rules, in the order they are checked: the code must exist, its validity window must contain now, the
    /// order must clear the minimum value, the global usage limit must not be exhausted, and this customer must not
    /// have redeemed it before. Each rule failure maps to its own [`CouponError`] kind so the checkout UI can say
    /// exactly why the code was refused.
    pub async fn validate(&self, code: &str, customer_id: &str, order_value: Paise) -> Result<Paise, CouponError> {
        let coupon =
            self.db.fetch_coupon(code).await?.ok_or_else(|| CouponError::UnknownCode(code.to_uppercase()))?;
        let now = Utc::now();
        if now < coupon.valid_from {
            return Err(CouponError::NotYetActive(coupon.code));
        }
        if now > coupon.valid_until {
            return Err(CouponError::Expired(coupon.code));
        }
        if order_value < coupon.min_order_value {
            return Err(CouponError::MinOrderValue { code: coupon.code, minimum: coupon.min_order_value });
        }
        if let Some(limit) = coupon.usage_limit {
            let used = self.db.coupon_usage_count(&coupon.code).await?;
            if used >= limit {
                return Err(CouponError::UsageLimitReached(coupon.code));
            }
        }
        if self.db.customer_has_used_coupon(&coupon.code, customer_id).await? {
            return Err(CouponError::AlreadyUsed(coupon.code));
        }
        let discount = coupon.discount_for(order_value);
        trace!("🎟️ Coupon {} valid for {customer_id}: {discount} off {order_value}", coupon.code);
        Ok(discount)
    }
}
