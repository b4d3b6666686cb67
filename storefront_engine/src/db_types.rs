use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use ssf_common::Paise;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct ConversionError(String);

//--------------------------------------        OrderId        -------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct OrderId(pub String);

impl FromStr for OrderId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl OrderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------      OrderStatus      -------------------------------------------------------
/// The order lifecycle state machine. The only permitted transitions are
///
/// ```text
/// Pending -> Processing -> Shipped -> Delivered
/// Pending -> Cancelled
/// Processing -> Cancelled
/// ```
///
/// `Delivered` and `Cancelled` are terminal. Everything else, including self-transitions, is rejected with
/// [`OrderFlowError::InvalidTransition`](crate::traits::OrderFlowError::InvalidTransition).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum OrderStatus {
    /// The order has been placed, but payment has not been confirmed yet.
    Pending,
    /// Payment is confirmed (or the order is COD) and the order is being prepared.
    Processing,
    /// The order has been handed to the courier.
    Shipped,
    /// The order has been delivered. Terminal.
    Delivered,
    /// The order has been cancelled by the customer or an admin. Terminal.
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Whether the state machine allows moving from `self` to `next`.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Processing) | (Pending, Cancelled) | (Processing, Shipped) | (Processing, Cancelled) | (Shipped, Delivered)
        )
    }

    /// Orders may only be cancelled before they ship.
    pub fn is_cancellable(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Processing)
    }
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "Pending"),
            OrderStatus::Processing => write!(f, "Processing"),
            OrderStatus::Shipped => write!(f, "Shipped"),
            OrderStatus::Delivered => write!(f, "Delivered"),
            OrderStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

impl FromStr for OrderStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Processing" => Ok(Self::Processing),
            "Shipped" => Ok(Self::Shipped),
            "Delivered" => Ok(Self::Delivered),
            "Cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

//--------------------------------------     PaymentMethod     -------------------------------------------------------
/// How the customer chose to pay at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PaymentMethod {
    Cod,
    Online,
    Card,
}

impl PaymentMethod {
    pub fn is_prepaid(&self) -> bool {
        !matches!(self, PaymentMethod::Cod)
    }
}

impl Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentMethod::Cod => write!(f, "Cod"),
            PaymentMethod::Online => write!(f, "Online"),
            PaymentMethod::Card => write!(f, "Card"),
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Cod" | "COD" => Ok(Self::Cod),
            "Online" => Ok(Self::Online),
            "Card" => Ok(Self::Card),
            s => Err(ConversionError(format!("Invalid payment method: {s}"))),
        }
    }
}

//--------------------------------------     PaymentChannel    -------------------------------------------------------
/// The concrete instrument a payment was (or will be) collected through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PaymentChannel {
    Card,
    Upi,
    Netbanking,
    Wallet,
    Cod,
}

impl Display for PaymentChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentChannel::Card => write!(f, "Card"),
            PaymentChannel::Upi => write!(f, "Upi"),
            PaymentChannel::Netbanking => write!(f, "Netbanking"),
            PaymentChannel::Wallet => write!(f, "Wallet"),
            PaymentChannel::Cod => write!(f, "Cod"),
        }
    }
}

//--------------------------------------     PaymentStatus     -------------------------------------------------------
/// Payment records move `Pending -> Success` only on a verified gateway signature, `Success -> Refunded` only via a
/// gateway refund. `Failed` is a dead end used for rejected or abandoned attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PaymentStatus {
    Pending,
    Success,
    Failed,
    Refunded,
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "Pending"),
            PaymentStatus::Success => write!(f, "Success"),
            PaymentStatus::Failed => write!(f, "Failed"),
            PaymentStatus::Refunded => write!(f, "Refunded"),
        }
    }
}

//--------------------------------------      RefundStatus     -------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum RefundStatus {
    Pending,
    Completed,
    Failed,
}

impl Display for RefundStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RefundStatus::Pending => write!(f, "Pending"),
            RefundStatus::Completed => write!(f, "Completed"),
            RefundStatus::Failed => write!(f, "Failed"),
        }
    }
}

//--------------------------------------      StockEntryType   -------------------------------------------------------
/// Every stock ledger entry carries one of these kinds. The quantity on the entry is always positive; the kind
/// determines the sign of the adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum StockEntryType {
    /// Goods received into the warehouse.
    Add,
    /// Manual write-off (damage, shrinkage).
    Remove,
    /// Stock-take correction, applied as an increase.
    Adjustment,
    /// Stock reserved for a placed order.
    Order,
    /// Stock restored after an order was cancelled.
    Cancellation,
    /// Stock restored after a customer return.
    Return,
}

impl StockEntryType {
    /// `Add`, `Adjustment`, `Cancellation` and `Return` increase stock; `Remove` and `Order` decrease it.
    pub fn increases_stock(&self) -> bool {
        use StockEntryType::*;
        matches!(self, Add | Adjustment | Cancellation | Return)
    }
}

impl Display for StockEntryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StockEntryType::Add => write!(f, "Add"),
            StockEntryType::Remove => write!(f, "Remove"),
            StockEntryType::Adjustment => write!(f, "Adjustment"),
            StockEntryType::Order => write!(f, "Order"),
            StockEntryType::Cancellation => write!(f, "Cancellation"),
            StockEntryType::Return => write!(f, "Return"),
        }
    }
}

impl FromStr for StockEntryType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Add" => Ok(Self::Add),
            "Remove" => Ok(Self::Remove),
            "Adjustment" => Ok(Self::Adjustment),
            "Order" => Ok(Self::Order),
            "Cancellation" => Ok(Self::Cancellation),
            "Return" => Ok(Self::Return),
            s => Err(ConversionError(format!("Invalid stock entry type: {s}"))),
        }
    }
}

//--------------------------------------        SizeCode       -------------------------------------------------------
/// The garment sizes the catalog tracks stock for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
pub enum SizeCode {
    S,
    M,
    L,
    XL,
}

impl Display for SizeCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SizeCode::S => write!(f, "S"),
            SizeCode::M => write!(f, "M"),
            SizeCode::L => write!(f, "L"),
            SizeCode::XL => write!(f, "XL"),
        }
    }
}

impl FromStr for SizeCode {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "S" => Ok(Self::S),
            "M" => Ok(Self::M),
            "L" => Ok(Self::L),
            "XL" => Ok(Self::XL),
            s => Err(ConversionError(format!("Invalid size code: {s}"))),
        }
    }
}

//--------------------------------------    ShippingAddress    -------------------------------------------------------
/// A denormalised snapshot of where the order ships to. Deliberately not a reference to a live address record:
/// editing an address after checkout must not change where an existing order is going.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub recipient: String,
    pub phone: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postcode: String,
}

//--------------------------------------     PriceBreakdown    -------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub items_total: Paise,
    pub shipping_total: Paise,
    pub tax_total: Paise,
    pub discount: Paise,
    pub grand_total: Paise,
}

impl PriceBreakdown {
    pub fn new(items_total: Paise, shipping_total: Paise, tax_total: Paise, discount: Paise) -> Self {
        let grand_total = items_total + shipping_total + tax_total - discount;
        Self { items_total, shipping_total, tax_total, discount, grand_total }
    }
}

//--------------------------------------         Order         -------------------------------------------------------
/// A flat order row. Items and the timeline live in their own tables; [`FullOrder`](crate::order_objects::FullOrder)
/// bundles all three for callers that need the whole aggregate.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub order_id: OrderId,
    pub customer_id: String,
    pub customer_email: String,
    pub payment_method: PaymentMethod,
    #[sqlx(flatten)]
    pub shipping: ShippingAddress,
    #[sqlx(flatten)]
    pub pricing: PriceBreakdown,
    pub coupon_code: Option<String>,
    pub currency: String,
    pub status: OrderStatus,
    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub is_delivered: bool,
    pub delivered_at: Option<DateTime<Utc>>,
    pub cancelled_reason: Option<String>,
    pub cancelled_by: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub refund_status: Option<RefundStatus>,
    pub refund_amount: Option<Paise>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// The cancellation block, present only once the order has been cancelled.
    pub fn cancellation(&self) -> Option<Cancellation> {
        let cancelled_at = self.cancelled_at?;
        Some(Cancellation {
            reason: self.cancelled_reason.clone().unwrap_or_default(),
            cancelled_by: self.cancelled_by.clone().unwrap_or_default(),
            cancelled_at,
            refund_status: self.refund_status,
            refund_amount: self.refund_amount,
        })
    }
}

/// Why, by whom and when an order was cancelled, and where the refund stands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cancellation {
    pub reason: String,
    pub cancelled_by: String,
    pub cancelled_at: DateTime<Utc>,
    pub refund_status: Option<RefundStatus>,
    pub refund_amount: Option<Paise>,
}

//--------------------------------------       NewOrder        -------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    /// The order_id as assigned by the storefront at checkout
    pub order_id: OrderId,
    pub customer_id: String,
    /// Denormalised so admins can free-text search orders without a join to the identity service
    pub customer_email: String,
    pub items: Vec<NewOrderItem>,
    pub shipping: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub pricing: PriceBreakdown,
    pub coupon_code: Option<String>,
}

impl NewOrder {
    pub fn new(
        order_id: OrderId,
        customer_id: String,
        customer_email: String,
        items: Vec<NewOrderItem>,
        shipping: ShippingAddress,
        payment_method: PaymentMethod,
        pricing: PriceBreakdown,
    ) -> Self {
        Self { order_id, customer_id, customer_email, items, shipping, payment_method, pricing, coupon_code: None }
    }

    pub fn with_coupon(mut self, code: &str) -> Self {
        self.coupon_code = Some(code.to_uppercase());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrderItem {
    pub product_id: String,
    /// Name and price are snapshots taken at checkout; later catalog edits must not rewrite order history.
    pub name: String,
    pub image: Option<String>,
    pub unit_price: Paise,
    pub quantity: i64,
    pub size: Option<SizeCode>,
}

impl NewOrderItem {
    pub fn new(product_id: &str, name: &str, unit_price: Paise, quantity: i64) -> Self {
        Self { product_id: product_id.into(), name: name.into(), image: None, unit_price, quantity, size: None }
    }

    pub fn with_size(mut self, size: SizeCode) -> Self {
        self.size = Some(size);
        self
    }
}

//--------------------------------------       OrderItem       -------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: OrderId,
    pub product_id: String,
    pub name: String,
    pub image: Option<String>,
    pub unit_price: Paise,
    pub quantity: i64,
    pub size: Option<SizeCode>,
}

//--------------------------------------     TimelineEntry     -------------------------------------------------------
/// One append-only entry in an order's history. Written in the same transaction as the status change it records.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub id: i64,
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub note: String,
    pub actor: String,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------      StockLevel       -------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct StockLevel {
    pub product_id: String,
    pub size: SizeCode,
    pub quantity: i64,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------     StockLogEntry     -------------------------------------------------------
/// One immutable row in the stock ledger. `new_stock - previous_stock` always equals `quantity` with the sign implied
/// by `entry_type`; rows are never updated or deleted once written.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct StockLogEntry {
    pub id: i64,
    pub product_id: String,
    pub size: SizeCode,
    pub entry_type: StockEntryType,
    pub quantity: i64,
    pub previous_stock: i64,
    pub new_stock: i64,
    pub reason: String,
    pub order_id: Option<OrderId>,
    pub actor: String,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------        Payment        -------------------------------------------------------
/// One payment attempt against an order. An order may accumulate several rows over retries, but at most one may be
/// `Success`.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub order_id: OrderId,
    pub customer_id: String,
    pub amount: Paise,
    pub currency: String,
    pub method: PaymentChannel,
    pub gateway: String,
    pub gateway_order_id: Option<String>,
    pub gateway_payment_id: Option<String>,
    pub gateway_signature: Option<String>,
    pub status: PaymentStatus,
    pub refund_id: Option<String>,
    pub refund_amount: Option<Paise>,
    pub refund_status: Option<RefundStatus>,
    pub refund_reason: Option<String>,
    pub refund_processed_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    /// The refund sub-record, present once a refund has been attempted against this payment.
    pub fn refund(&self) -> Option<RefundRecord> {
        let status = self.refund_status?;
        Some(RefundRecord {
            refund_id: self.refund_id.clone(),
            amount: self.refund_amount.unwrap_or_default(),
            status,
            reason: self.refund_reason.clone(),
            processed_at: self.refund_processed_at,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundRecord {
    pub refund_id: Option<String>,
    pub amount: Paise,
    pub status: RefundStatus,
    pub reason: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
}

//--------------------------------------       NewPayment      -------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub order_id: OrderId,
    pub customer_id: String,
    pub amount: Paise,
    pub method: PaymentChannel,
    pub gateway: String,
    /// Present for gateway payments, absent for COD.
    pub gateway_order_id: Option<String>,
}

impl NewPayment {
    pub fn new(order_id: OrderId, customer_id: String, amount: Paise, method: PaymentChannel, gateway: &str) -> Self {
        Self { order_id, customer_id, amount, method, gateway: gateway.into(), gateway_order_id: None }
    }

    pub fn with_gateway_order_id(mut self, gateway_order_id: &str) -> Self {
        self.gateway_order_id = Some(gateway_order_id.into());
        self
    }
}

//--------------------------------------        Coupon         -------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum DiscountType {
    Percentage,
    Fixed,
}

impl Display for DiscountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiscountType::Percentage => write!(f, "Percentage"),
            DiscountType::Fixed => write!(f, "Fixed"),
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Coupon {
    /// Codes are stored and matched uppercase.
    pub code: String,
    pub discount_type: DiscountType,
    /// Percent (0..=100) for `Percentage` coupons, paise for `Fixed` ones.
    pub value: i64,
    pub min_order_value: Paise,
    pub max_discount: Option<Paise>,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub usage_limit: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl Coupon {
    /// The discount this coupon grants on `order_value`, with percentage discounts capped by `max_discount`.
    pub fn discount_for(&self, order_value: Paise) -> Paise {
        match self.discount_type {
            DiscountType::Fixed => Paise::from(self.value).min(order_value),
            DiscountType::Percentage => {
                let raw = Paise::from(order_value.value() * self.value / 100);
                match self.max_discount {
                    Some(cap) => raw.min(cap),
                    None => raw,
                }
            },
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn status_transition_table() {
        use OrderStatus::*;
        let allowed =
            [(Pending, Processing), (Pending, Cancelled), (Processing, Shipped), (Processing, Cancelled), (Shipped, Delivered)];
        let all = [Pending, Processing, Shipped, Delivered, Cancelled];
        for from in all {
            for to in all {
                let expected = allowed.contains(&(from, to));
                assert_eq!(from.can_transition_to(to), expected, "transition {from} -> {to}");
            }
        }
    }

    #[test]
    fn terminal_statuses() {
        assert!(OrderStatus::Delivered.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(!OrderStatus::Processing.is_terminal());
        assert!(OrderStatus::Pending.is_cancellable());
        assert!(OrderStatus::Processing.is_cancellable());
        assert!(!OrderStatus::Shipped.is_cancellable());
    }

    #[test]
    fn entry_type_signs() {
        use StockEntryType::*;
        for t in [Add, Adjustment, Cancellation, Return] {
            assert!(t.increases_stock());
        }
        for t in [Remove, Order] {
            assert!(!t.increases_stock());
        }
    }

    #[test]
    fn coupon_discounts() {
        let mut coupon = Coupon {
            code: "FESTIVE10".into(),
            discount_type: DiscountType::Percentage,
            value: 10,
            min_order_value: Paise::from_rupees(500),
            max_discount: Some(Paise::from_rupees(200)),
            valid_from: Utc::now(),
            valid_until: Utc::now(),
            usage_limit: None,
            created_at: Utc::now(),
        };
        assert_eq!(coupon.discount_for(Paise::from_rupees(1000)), Paise::from_rupees(100));
        // 10% of ₹5000 is ₹500, capped at ₹200
        assert_eq!(coupon.discount_for(Paise::from_rupees(5000)), Paise::from_rupees(200));
        coupon.discount_type = DiscountType::Fixed;
        coupon.value = Paise::from_rupees(150).value();
        assert_eq!(coupon.discount_for(Paise::from_rupees(1000)), Paise::from_rupees(150));
        // a fixed discount never exceeds the order value
        assert_eq!(coupon.discount_for(Paise::from_rupees(1)), Paise::from_rupees(1));
    }
}
