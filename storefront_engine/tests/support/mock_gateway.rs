use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use ssf_common::{Paise, Secret};
use storefront_engine::{
    helpers::{calculate_signature, signature_payload},
    traits::{GatewayError, GatewayOrder, GatewayOrderRequest, GatewayRefund, PaymentProvider},
};

pub const TEST_GATEWAY_SECRET: &str = "test_gateway_secret";

/// An in-memory stand-in for the payment gateway. Hands out sequential gateway order/refund ids and can be told to
/// reject refunds to exercise the failure path.
#[derive(Clone)]
pub struct TestGateway {
    secret: Secret<String>,
    counter: Arc<AtomicU64>,
    fail_refunds: bool,
}

impl Default for TestGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl TestGateway {
    pub fn new() -> Self {
        Self { secret: Secret::new(TEST_GATEWAY_SECRET.to_string()), counter: Arc::new(AtomicU64::new(0)), fail_refunds: false }
    }

    pub fn rejecting_refunds() -> Self {
        Self { fail_refunds: true, ..Self::new() }
    }

    /// A signature the gateway would have produced for this order/payment pair.
    pub fn sign(&self, gateway_order_id: &str, gateway_payment_id: &str) -> String {
        let payload = signature_payload(gateway_order_id, gateway_payment_id);
        calculate_signature(self.secret.reveal(), payload.as_bytes())
    }
}

impl PaymentProvider for TestGateway {
    fn name(&self) -> &str {
        "testpay"
    }

    fn signature_secret(&self) -> &Secret<String> {
        &self.secret
    }

    async fn create_order(&self, request: GatewayOrderRequest) -> Result<GatewayOrder, GatewayError> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(GatewayOrder { gateway_order_id: format!("gwo_{n:04}"), amount: request.amount, currency: request.currency })
    }

    async fn refund(&self, gateway_payment_id: &str, amount: Paise, _notes: &str) -> Result<GatewayRefund, GatewayError> {
        if self.fail_refunds {
            return Err(GatewayError::RefundFailed(format!("refund of {amount} for {gateway_payment_id} declined")));
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(GatewayRefund { refund_id: format!("rfnd_{n:04}"), amount })
    }
}
