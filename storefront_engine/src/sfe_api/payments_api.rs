use std::fmt::Debug;

use log::*;
use ssf_common::{Paise, INR_CURRENCY_CODE};

use crate::{
    db_types::{NewPayment, Order, OrderId, Payment, PaymentChannel, PaymentMethod, PaymentStatus},
    events::{EventProducers, OrderPaidEvent},
    helpers::verify_gateway_signature,
    payment_objects::{PaymentVerification, PendingGatewayOrder},
    traits::{GatewayOrderRequest, OrderManagement, PaymentApiError, PaymentProvider, StorefrontDatabase},
};

/// `PaymentsApi` handles everything money: registering gateway orders, verifying payment callbacks, COD
/// bookkeeping, and refunds. Gateway failures abort the operation and surface to the caller; only the downstream
/// notifications are fire-and-forget.
pub struct PaymentsApi<B, G> {
    db: B,
    gateway: G,
    producers: EventProducers,
}

impl<B, G> Debug for PaymentsApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentsApi")
    }
}

impl<B, G> PaymentsApi<B, G> {
    pub fn new(db: B, gateway: G, producers: EventProducers) -> Self {
        Self { db, gateway, producers }
    }
}

impl<B, G> PaymentsApi<B, G>
where
    B: StorefrontDatabase,
    G: PaymentProvider,
{
    /// Registers the order with the payment gateway and opens a local `Pending` payment row for it.
    ///
    /// The amount always comes from the stored order, never from the caller — the client only says *which* order it
    /// wants to pay and through which instrument. Fails with `OrderNotFound` if the order does not exist, or with a
    /// `GatewayError` if the gateway is misconfigured or unreachable.
    pub async fn create_payment_order(
        &self,
        order_id: &OrderId,
        customer_id: &str,
        channel: PaymentChannel,
    ) -> Result<PendingGatewayOrder, PaymentApiError> {
        let order =
            self.db.fetch_order(order_id).await?.ok_or_else(|| PaymentApiError::OrderNotFound(order_id.clone()))?;
        let amount = order.pricing.grand_total;
        let request = GatewayOrderRequest::new(amount, INR_CURRENCY_CODE, order_id.as_str())
            .with_notes(serde_json::json!({ "customer_id": customer_id }));
        let gateway_order = self.gateway.create_order(request).await?;
        debug!("💳️ Gateway order {} registered for order {order_id}", gateway_order.gateway_order_id);
        let payment = NewPayment::new(order_id.clone(), customer_id.to_string(), amount, channel, self.gateway.name())
            .with_gateway_order_id(&gateway_order.gateway_order_id);
        let payment = self.db.insert_payment(payment).await?;
        Ok(PendingGatewayOrder {
            payment,
            gateway_order_id: gateway_order.gateway_order_id,
            amount,
            currency: gateway_order.currency,
        })
    }

    /// Verifies a gateway payment callback.
    ///
    /// The expected signature is recomputed over `"{gateway_order_id}|{gateway_payment_id}"` with the shared
    /// secret. On a mismatch nothing is mutated and the result is [`PaymentVerification::Rejected`] — a result, not
    /// an error, since forged or mangled callbacks are business as usual on a public endpoint. On a match the
    /// payment is marked `Success` and its order becomes paid and `Processing`, atomically, and the order-paid event
    /// fires. Re-delivery of an already-verified callback is idempotent.
    pub async fn verify_payment(
        &self,
        gateway_order_id: &str,
        gateway_payment_id: &str,
        signature: &str,
    ) -> Result<PaymentVerification, PaymentApiError> {
        let payment = self
            .db
            .fetch_payment_by_gateway_order(gateway_order_id)
            .await?
            .ok_or_else(|| PaymentApiError::PaymentNotFound(gateway_order_id.to_string()))?;
        if payment.status == PaymentStatus::Success {
            debug!("💳️ Callback for {gateway_order_id} re-delivered; payment already verified");
            let order = self
                .db
                .fetch_order(&payment.order_id)
                .await?
                .ok_or_else(|| PaymentApiError::OrderNotFound(payment.order_id.clone()))?;
            return Ok(PaymentVerification::Verified { payment, order });
        }
        if !verify_gateway_signature(self.gateway.signature_secret(), gateway_order_id, gateway_payment_id, signature) {
            warn!("💳️ Signature mismatch on callback for gateway order {gateway_order_id}. No state was changed.");
            return Ok(PaymentVerification::Rejected {
                gateway_order_id: gateway_order_id.to_string(),
                reason: "Signature verification failed".to_string(),
            });
        }
        let (payment, order) = self.db.mark_payment_success(payment.id, gateway_payment_id, signature).await?;
        info!("💳️ Payment {gateway_payment_id} verified; order {} is paid", order.order_id);
        self.call_order_paid_hook(&order, &payment).await;
        Ok(PaymentVerification::Verified { payment, order })
    }

    /// Opens a COD payment for the order and advances it straight to `Processing`. There is no gateway involved;
    /// the payment row stays `Pending` until cash changes hands at the door.
    pub async fn create_cod_payment(&self, order_id: &OrderId, customer_id: &str) -> Result<(Payment, Order), PaymentApiError> {
        let order =
            self.db.fetch_order(order_id).await?.ok_or_else(|| PaymentApiError::OrderNotFound(order_id.clone()))?;
        if order.payment_method != PaymentMethod::Cod {
            return Err(PaymentApiError::NotACodOrder(order_id.clone()));
        }
        let payment = NewPayment::new(
            order_id.clone(),
            customer_id.to_string(),
            order.pricing.grand_total,
            PaymentChannel::Cod,
            "cod",
        );
        let (payment, order) = self.db.insert_cod_payment(payment, "COD order confirmed").await?;
        debug!("💳️ COD payment opened for order {order_id}");
        Ok((payment, order))
    }

    /// Refunds the order's captured payment through the gateway, fully by default or partially if `amount` is given.
    ///
    /// Requires a `Success` payment on the order. On gateway success the payment flips to `Refunded` with a
    /// completed refund sub-record and the order's cancellation block advances to `Completed`. If the gateway
    /// rejects the call, the attempt is recorded on the payment as a `Failed` refund and the gateway error is
    /// re-raised so the admin sees it.
    pub async fn process_refund(
        &self,
        order_id: &OrderId,
        amount: Option<Paise>,
        reason: &str,
    ) -> Result<Payment, PaymentApiError> {
        let payment = self
            .db
            .latest_successful_payment(order_id)
            .await?
            .ok_or_else(|| PaymentApiError::RefundNotAllowed(format!("Order {order_id} has no successful payment")))?;
        let amount = amount.unwrap_or(payment.amount);
        if amount <= Paise::from(0) || amount > payment.amount {
            return Err(PaymentApiError::InvalidRefundAmount(format!(
                "{amount} is outside the refundable range for payment of {}",
                payment.amount
            )));
        }
        let gateway_payment_id = payment
            .gateway_payment_id
            .clone()
            .ok_or_else(|| PaymentApiError::RefundNotAllowed(format!("Payment for {order_id} has no gateway payment id")))?;
        match self.gateway.refund(&gateway_payment_id, amount, reason).await {
            Ok(refund) => {
                let updated = self.db.record_refund(payment.id, &refund.refund_id, amount, reason).await?;
                info!("💳️ Refund {} of {amount} completed for order {order_id}", refund.refund_id);
                Ok(updated)
            },
            Err(e) => {
                error!("💳️ Gateway refused refund of {amount} for order {order_id}: {e}");
                self.db.record_refund_failure(payment.id, amount, reason).await?;
                Err(e.into())
            },
        }
    }

    /// Every payment attempt recorded against the order, newest first.
    pub async fn payment_status(&self, order_id: &OrderId) -> Result<Vec<Payment>, PaymentApiError> {
        self.db.payments_for_order(order_id).await
    }

    async fn call_order_paid_hook(&self, order: &Order, payment: &Payment) {
        for emitter in &self.producers.order_paid_producer {
            let event = OrderPaidEvent::new(order.clone(), payment.clone());
            emitter.publish_event(event).await;
        }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }
}
