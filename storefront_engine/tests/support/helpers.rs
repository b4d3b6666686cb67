use ssf_common::Paise;
use storefront_engine::{
    db_types::{NewOrder, NewOrderItem, OrderId, PaymentMethod, PriceBreakdown, ShippingAddress, SizeCode, StockEntryType},
    traits::{InventoryManagement, StockAdjustment},
    SqliteDatabase,
};

pub const ADMIN: &str = "admin-01";

pub fn shipping_address() -> ShippingAddress {
    ShippingAddress {
        recipient: "Meera Nair".into(),
        phone: "+91-9800011122".into(),
        line1: "14 Temple Street".into(),
        line2: None,
        city: "Kochi".into(),
        state: "Kerala".into(),
        postcode: "682001".into(),
    }
}

pub fn pricing_for(items: &[NewOrderItem]) -> PriceBreakdown {
    let items_total: Paise = items.iter().map(|i| i.unit_price * i.quantity).sum();
    PriceBreakdown::new(items_total, Paise::from_rupees(50), Paise::from(0), Paise::from(0))
}

/// A one-item prepaid order for `quantity` units of `product_id` in size M.
pub fn sample_order(order_id: &str, customer: &str, product_id: &str, quantity: i64) -> NewOrder {
    let items =
        vec![NewOrderItem::new(product_id, "Kanchipuram silk saree", Paise::from_rupees(4_500), quantity).with_size(SizeCode::M)];
    let pricing = pricing_for(&items);
    NewOrder::new(
        OrderId::from(order_id.to_string()),
        customer.into(),
        format!("{customer}@example.com"),
        items,
        shipping_address(),
        PaymentMethod::Online,
        pricing,
    )
}

pub fn sample_cod_order(order_id: &str, customer: &str, product_id: &str, quantity: i64) -> NewOrder {
    let mut order = sample_order(order_id, customer, product_id, quantity);
    order.payment_method = PaymentMethod::Cod;
    order
}

/// Registers the product/size and stocks it with `quantity` units through the normal `Add` adjustment path.
pub async fn seed_stock(db: &SqliteDatabase, product_id: &str, size: SizeCode, quantity: i64) {
    db.register_size(product_id, size).await.expect("Error registering size");
    if quantity > 0 {
        let adjustment =
            StockAdjustment::new(product_id, size, StockEntryType::Add, quantity, "Initial goods received", ADMIN);
        db.adjust_stock(adjustment).await.expect("Error seeding stock");
    }
}
