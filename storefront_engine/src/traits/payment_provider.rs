use serde::{Deserialize, Serialize};
use ssf_common::{Paise, Secret};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("Payment gateway is not configured: {0}")]
    Misconfigured(String),
    #[error("Payment gateway call failed: {0}")]
    RequestFailed(String),
    #[error("Payment gateway rejected the refund: {0}")]
    RefundFailed(String),
}

/// A request to register an order on the gateway side before the customer is shown the payment widget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayOrderRequest {
    pub amount: Paise,
    pub currency: String,
    /// Our order id, echoed back by the gateway in webhooks.
    pub receipt: String,
    pub notes: serde_json::Value,
}

impl GatewayOrderRequest {
    pub fn new(amount: Paise, currency: &str, receipt: &str) -> Self {
        Self { amount, currency: currency.into(), receipt: receipt.into(), notes: serde_json::Value::Null }
    }

    pub fn with_notes(mut self, notes: serde_json::Value) -> Self {
        self.notes = notes;
        self
    }
}

/// The gateway's handle for a registered order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayOrder {
    pub gateway_order_id: String,
    pub amount: Paise,
    pub currency: String,
}

/// The gateway's response to a refund request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayRefund {
    pub refund_id: String,
    pub amount: Paise,
}

/// The external payment gateway collaborator.
///
/// Live implementations wrap the provider's HTTP API (order registration and refunds); the shared signature secret
/// is what [`verify_gateway_signature`](crate::helpers::verify_gateway_signature) checks callback signatures
/// against. Transport and configuration failures surface as [`GatewayError`] and abort the operation in progress;
/// they are never swallowed the way notification failures are.
#[allow(async_fn_in_trait)]
pub trait PaymentProvider: Clone {
    /// The gateway's name, recorded on every payment row it touches.
    fn name(&self) -> &str;

    /// The shared secret used to verify callback signatures.
    fn signature_secret(&self) -> &Secret<String>;

    /// Registers an order with the gateway and returns its handle.
    async fn create_order(&self, request: GatewayOrderRequest) -> Result<GatewayOrder, GatewayError>;

    /// Requests a (full or partial) refund of a captured payment.
    async fn refund(&self, gateway_payment_id: &str, amount: Paise, notes: &str) -> Result<GatewayRefund, GatewayError>;
}
