use ssf_common::Paise;
use storefront_engine::{
    db_types::{OrderId, OrderStatus, PaymentChannel, PaymentStatus, RefundStatus, SizeCode},
    events::EventProducers,
    payment_objects::PaymentVerification,
    traits::{OrderManagement, PaymentApiError},
    OrderFlowApi,
    PaymentsApi,
    SqliteDatabase,
};

use crate::support::{
    helpers::{sample_cod_order, sample_order, seed_stock, ADMIN},
    mock_gateway::TestGateway,
    prepare_env::{setup, tear_down},
};

mod support;

fn apis(db: &SqliteDatabase, gateway: TestGateway) -> (OrderFlowApi<SqliteDatabase>, PaymentsApi<SqliteDatabase, TestGateway>) {
    let orders = OrderFlowApi::new(db.clone(), EventProducers::default());
    let payments = PaymentsApi::new(db.clone(), gateway, EventProducers::default());
    (orders, payments)
}

#[tokio::test]
async fn a_verified_callback_marks_the_payment_and_order_paid() {
    let db = setup().await;
    let gateway = TestGateway::new();
    let (orders, payments) = apis(&db, gateway.clone());
    seed_stock(&db, "saree-200", SizeCode::M, 5).await;
    let placed = orders.place_order(sample_order("ord-200", "cust-1", "saree-200", 1)).await.unwrap();

    let pending = payments.create_payment_order(&placed.order_id, "cust-1", PaymentChannel::Upi).await.unwrap();
    assert_eq!(pending.payment.status, PaymentStatus::Pending);
    assert_eq!(pending.amount, placed.pricing.grand_total);
    assert_eq!(pending.payment.gateway, "testpay");

    let signature = gateway.sign(&pending.gateway_order_id, "pay_0001");
    let outcome = payments.verify_payment(&pending.gateway_order_id, "pay_0001", &signature).await.unwrap();
    let PaymentVerification::Verified { payment, order } = outcome else {
        panic!("Expected the payment to verify");
    };
    assert_eq!(payment.status, PaymentStatus::Success);
    assert_eq!(payment.gateway_payment_id.as_deref(), Some("pay_0001"));
    assert!(payment.completed_at.is_some());
    assert!(order.is_paid);
    assert!(order.paid_at.is_some());
    assert_eq!(order.status, OrderStatus::Processing);

    let timeline = db.fetch_timeline(&order.order_id).await.unwrap();
    assert_eq!(timeline.last().unwrap().note, "Payment confirmed");
    tear_down(db).await;
}

#[tokio::test]
async fn a_bad_signature_is_rejected_without_touching_state() {
    let db = setup().await;
    let gateway = TestGateway::new();
    let (orders, payments) = apis(&db, gateway.clone());
    seed_stock(&db, "saree-201", SizeCode::M, 5).await;
    let placed = orders.place_order(sample_order("ord-201", "cust-1", "saree-201", 1)).await.unwrap();
    let pending = payments.create_payment_order(&placed.order_id, "cust-1", PaymentChannel::Card).await.unwrap();

    // signature computed over the wrong payment id
    let forged = gateway.sign(&pending.gateway_order_id, "pay_other");
    let outcome = payments.verify_payment(&pending.gateway_order_id, "pay_9999", &forged).await.unwrap();
    assert!(matches!(outcome, PaymentVerification::Rejected { .. }));

    let rows = payments.payment_status(&placed.order_id).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status, PaymentStatus::Pending);
    assert!(rows[0].gateway_payment_id.is_none());
    let order = db.fetch_order(&placed.order_id).await.unwrap().unwrap();
    assert!(!order.is_paid);
    assert_eq!(order.status, OrderStatus::Pending);
    tear_down(db).await;
}

#[tokio::test]
async fn callbacks_for_unknown_gateway_orders_are_not_found() {
    let db = setup().await;
    let gateway = TestGateway::new();
    let (_, payments) = apis(&db, gateway.clone());
    let signature = gateway.sign("gwo_9999", "pay_1");
    let err = payments.verify_payment("gwo_9999", "pay_1", &signature).await.expect_err("should fail");
    assert!(matches!(err, PaymentApiError::PaymentNotFound(_)));
    tear_down(db).await;
}

#[tokio::test]
async fn redelivered_callbacks_are_idempotent() {
    let db = setup().await;
    let gateway = TestGateway::new();
    let (orders, payments) = apis(&db, gateway.clone());
    seed_stock(&db, "saree-202", SizeCode::M, 5).await;
    let placed = orders.place_order(sample_order("ord-202", "cust-1", "saree-202", 1)).await.unwrap();
    let pending = payments.create_payment_order(&placed.order_id, "cust-1", PaymentChannel::Upi).await.unwrap();
    let signature = gateway.sign(&pending.gateway_order_id, "pay_0001");

    let first = payments.verify_payment(&pending.gateway_order_id, "pay_0001", &signature).await.unwrap();
    assert!(first.is_verified());
    let second = payments.verify_payment(&pending.gateway_order_id, "pay_0001", &signature).await.unwrap();
    assert!(second.is_verified());

    let rows = payments.payment_status(&placed.order_id).await.unwrap();
    assert_eq!(rows.iter().filter(|p| p.status == PaymentStatus::Success).count(), 1);
    tear_down(db).await;
}

#[tokio::test]
async fn cod_orders_advance_to_processing_without_being_paid() {
    let db = setup().await;
    let gateway = TestGateway::new();
    let (orders, payments) = apis(&db, gateway.clone());
    seed_stock(&db, "saree-203", SizeCode::M, 5).await;
    let placed = orders.place_order(sample_cod_order("ord-203", "cust-1", "saree-203", 1)).await.unwrap();

    let (payment, order) = payments.create_cod_payment(&placed.order_id, "cust-1").await.unwrap();
    assert_eq!(payment.status, PaymentStatus::Pending);
    assert_eq!(payment.method, PaymentChannel::Cod);
    assert!(payment.gateway_order_id.is_none());
    assert_eq!(order.status, OrderStatus::Processing);
    // cash is collected at the door, not now
    assert!(!order.is_paid);

    let timeline = db.fetch_timeline(&order.order_id).await.unwrap();
    assert_eq!(timeline.last().unwrap().note, "COD order confirmed");

    // a prepaid order cannot take the COD path
    seed_stock(&db, "saree-204", SizeCode::M, 5).await;
    let prepaid = orders.place_order(sample_order("ord-204", "cust-1", "saree-204", 1)).await.unwrap();
    let err = payments.create_cod_payment(&prepaid.order_id, "cust-1").await.expect_err("should fail");
    assert!(matches!(err, PaymentApiError::NotACodOrder(_)));
    tear_down(db).await;
}

#[tokio::test]
async fn refunds_complete_the_cancellation_money_trail() {
    let db = setup().await;
    let gateway = TestGateway::new();
    let (orders, payments) = apis(&db, gateway.clone());
    seed_stock(&db, "saree-205", SizeCode::M, 5).await;
    let placed = orders.place_order(sample_order("ord-205", "cust-1", "saree-205", 1)).await.unwrap();
    let pending = payments.create_payment_order(&placed.order_id, "cust-1", PaymentChannel::Card).await.unwrap();
    let signature = gateway.sign(&pending.gateway_order_id, "pay_0001");
    payments.verify_payment(&pending.gateway_order_id, "pay_0001", &signature).await.unwrap();

    // a paid order that gets cancelled opens a pending refund
    let cancelled = orders.cancel_order(&placed.order_id, "Wrong colour", ADMIN, ADMIN).await.unwrap();
    let block = cancelled.cancellation().unwrap();
    assert_eq!(block.refund_status, Some(RefundStatus::Pending));
    assert_eq!(block.refund_amount, Some(cancelled.pricing.grand_total));

    let refunded = payments.process_refund(&placed.order_id, None, "Cancelled order").await.unwrap();
    assert_eq!(refunded.status, PaymentStatus::Refunded);
    let record = refunded.refund().unwrap();
    assert_eq!(record.status, RefundStatus::Completed);
    assert_eq!(record.amount, cancelled.pricing.grand_total);
    assert!(record.refund_id.is_some());
    assert!(record.processed_at.is_some());

    let order = db.fetch_order(&placed.order_id).await.unwrap().unwrap();
    assert_eq!(order.refund_status, Some(RefundStatus::Completed));
    tear_down(db).await;
}

#[tokio::test]
async fn refunds_require_a_captured_payment() {
    let db = setup().await;
    let gateway = TestGateway::new();
    let (orders, payments) = apis(&db, gateway.clone());
    seed_stock(&db, "saree-206", SizeCode::M, 5).await;
    let placed = orders.place_order(sample_order("ord-206", "cust-1", "saree-206", 1)).await.unwrap();

    let err = payments.process_refund(&placed.order_id, None, "nothing to refund").await.expect_err("should fail");
    assert!(matches!(err, PaymentApiError::RefundNotAllowed(_)));
    let missing = OrderId::from("no-such-order".to_string());
    let err = payments.process_refund(&missing, None, "nothing at all").await.expect_err("should fail");
    assert!(matches!(err, PaymentApiError::RefundNotAllowed(_)));
    tear_down(db).await;
}

#[tokio::test]
async fn a_gateway_rejection_records_the_failed_refund_and_surfaces() {
    let db = setup().await;
    let gateway = TestGateway::rejecting_refunds();
    let (orders, payments) = apis(&db, gateway.clone());
    seed_stock(&db, "saree-207", SizeCode::M, 5).await;
    let placed = orders.place_order(sample_order("ord-207", "cust-1", "saree-207", 1)).await.unwrap();
    let pending = payments.create_payment_order(&placed.order_id, "cust-1", PaymentChannel::Card).await.unwrap();
    let signature = gateway.sign(&pending.gateway_order_id, "pay_0001");
    payments.verify_payment(&pending.gateway_order_id, "pay_0001", &signature).await.unwrap();

    let err = payments.process_refund(&placed.order_id, None, "attempt").await.expect_err("gateway should refuse");
    assert!(matches!(err, PaymentApiError::Gateway(_)));

    // the payment stays captured, but the failed attempt is on record
    let rows = payments.payment_status(&placed.order_id).await.unwrap();
    let payment = rows.iter().find(|p| p.status == PaymentStatus::Success).expect("payment should stay Success");
    let record = payment.refund().expect("failed refund should be recorded");
    assert_eq!(record.status, RefundStatus::Failed);
    tear_down(db).await;
}

#[tokio::test]
async fn partial_refunds_are_bounded_by_the_captured_amount() {
    let db = setup().await;
    let gateway = TestGateway::new();
    let (orders, payments) = apis(&db, gateway.clone());
    seed_stock(&db, "saree-208", SizeCode::M, 5).await;
    let placed = orders.place_order(sample_order("ord-208", "cust-1", "saree-208", 1)).await.unwrap();
    let pending = payments.create_payment_order(&placed.order_id, "cust-1", PaymentChannel::Card).await.unwrap();
    let signature = gateway.sign(&pending.gateway_order_id, "pay_0001");
    payments.verify_payment(&pending.gateway_order_id, "pay_0001", &signature).await.unwrap();

    let too_much = placed.pricing.grand_total + Paise::from_rupees(1);
    let err = payments.process_refund(&placed.order_id, Some(too_much), "greedy").await.expect_err("should fail");
    assert!(matches!(err, PaymentApiError::InvalidRefundAmount(_)));

    let partial = Paise::from_rupees(500);
    let refunded = payments.process_refund(&placed.order_id, Some(partial), "partial goodwill").await.unwrap();
    assert_eq!(refunded.refund().unwrap().amount, partial);
    tear_down(db).await;
}

#[tokio::test]
async fn payment_attempts_are_listed_newest_first() {
    let db = setup().await;
    let gateway = TestGateway::new();
    let (orders, payments) = apis(&db, gateway.clone());
    seed_stock(&db, "saree-209", SizeCode::M, 5).await;
    let placed = orders.place_order(sample_order("ord-209", "cust-1", "saree-209", 1)).await.unwrap();
    let first = payments.create_payment_order(&placed.order_id, "cust-1", PaymentChannel::Upi).await.unwrap();
    let second = payments.create_payment_order(&placed.order_id, "cust-1", PaymentChannel::Card).await.unwrap();

    let rows = payments.payment_status(&placed.order_id).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].id, second.payment.id);
    assert_eq!(rows[1].id, first.payment.id);
    tear_down(db).await;
}
