use std::sync::{
    atomic::{AtomicI32, Ordering},
    Arc,
};

use futures_util::FutureExt;
use log::*;
use storefront_engine::{
    db_types::{PaymentChannel, SizeCode},
    events::{EventHandlers, EventHooks},
    OrderFlowApi,
    PaymentsApi,
};
use tokio::runtime::Runtime;

use crate::support::{
    helpers::{sample_order, seed_stock},
    mock_gateway::TestGateway,
    prepare_env::{setup, tear_down},
};

mod support;

#[derive(Default, Clone)]
struct HookCalled {
    called: Arc<AtomicI32>,
}

impl HookCalled {
    pub fn called(&self) {
        let _ = self.called.fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> i32 {
        self.called.load(Ordering::Relaxed)
    }
}

#[test]
fn order_placement_and_cancellation_hooks_fire() {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    let rt = Runtime::new().unwrap();
    let placed_count = HookCalled::default();
    let cancelled_count = HookCalled::default();
    let placed_copy = placed_count.clone();
    let cancelled_copy = cancelled_count.clone();
    rt.block_on(async move {
        let mut hooks = EventHooks::default();
        hooks.on_order_placed(move |event| {
            info!("🪝️ order placed: {}", event.order.order_id);
            placed_copy.called();
            async {}.boxed()
        });
        hooks.on_order_cancelled(move |event| {
            info!("🪝️ order cancelled: {}", event.order.order_id);
            cancelled_copy.called();
            async {}.boxed()
        });
        let handlers = EventHandlers::new(8, hooks);
        let producers = handlers.producers();
        handlers.start_handlers().await;

        let db = setup().await;
        let api = OrderFlowApi::new(db.clone(), producers);
        seed_stock(&db, "saree-300", SizeCode::M, 10).await;
        let first = api.place_order(sample_order("ord-300", "asha", "saree-300", 1)).await.expect("Error placing order");
        api.place_order(sample_order("ord-301", "vikram", "saree-300", 1)).await.expect("Error placing order");
        api.cancel_order(&first.order_id, "hook test", "asha", "asha").await.expect("Error cancelling order");
        // give the handler tasks a beat to drain before tearing down
        tokio::time::sleep(tokio::time::Duration::from_millis(250)).await;
        tear_down(db).await;
    });
    assert_eq!(placed_count.count(), 2);
    assert_eq!(cancelled_count.count(), 1);
    info!("🪝️ test complete");
}

#[test]
fn order_paid_hook_fires_on_verified_payment_only() {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    let rt = Runtime::new().unwrap();
    let paid_count = HookCalled::default();
    let paid_copy = paid_count.clone();
    rt.block_on(async move {
        let mut hooks = EventHooks::default();
        hooks.on_order_paid(move |event| {
            info!("🪝️ order paid: {} via {}", event.order.order_id, event.payment.gateway);
            paid_copy.called();
            async {}.boxed()
        });
        let handlers = EventHandlers::new(8, hooks);
        let producers = handlers.producers();
        handlers.start_handlers().await;

        let db = setup().await;
        let gateway = TestGateway::new();
        let orders = OrderFlowApi::new(db.clone(), producers.clone());
        let payments = PaymentsApi::new(db.clone(), gateway.clone(), producers);
        seed_stock(&db, "saree-301", SizeCode::M, 10).await;
        let placed = orders.place_order(sample_order("ord-302", "asha", "saree-301", 1)).await.unwrap();
        let pending = payments.create_payment_order(&placed.order_id, "asha", PaymentChannel::Upi).await.unwrap();

        // a rejected callback must not fire the hook
        let bad = gateway.sign(&pending.gateway_order_id, "pay_wrong");
        let outcome = payments.verify_payment(&pending.gateway_order_id, "pay_0001", &bad).await.unwrap();
        assert!(!outcome.is_verified());

        let good = gateway.sign(&pending.gateway_order_id, "pay_0001");
        let outcome = payments.verify_payment(&pending.gateway_order_id, "pay_0001", &good).await.unwrap();
        assert!(outcome.is_verified());

        tokio::time::sleep(tokio::time::Duration::from_millis(250)).await;
        tear_down(db).await;
    });
    assert_eq!(paid_count.count(), 1);
    info!("🪝️ test complete");
}
