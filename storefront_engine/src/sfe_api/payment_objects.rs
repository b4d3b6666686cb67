use serde::{Deserialize, Serialize};
use ssf_common::Paise;

use crate::db_types::{Order, Payment};

/// What the checkout flow needs to open the gateway's payment widget: the local payment row plus the gateway-side
/// order handle it was registered under.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingGatewayOrder {
    pub payment: Payment,
    pub gateway_order_id: String,
    pub amount: Paise,
    pub currency: String,
}

/// The outcome of a payment verification attempt.
///
/// A signature mismatch is an expected, non-exceptional outcome (bad actors and broken redirects both produce
/// them), so it is reported as data rather than as an error. Nothing is mutated on the `Rejected` path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PaymentVerification {
    /// The signature checked out; the payment is `Success` and the order is paid and `Processing`.
    Verified { payment: Payment, order: Order },
    /// The signature did not match. State is untouched; the payment stays `Pending`.
    Rejected { gateway_order_id: String, reason: String },
}

impl PaymentVerification {
    pub fn is_verified(&self) -> bool {
        matches!(self, PaymentVerification::Verified { .. })
    }
}
