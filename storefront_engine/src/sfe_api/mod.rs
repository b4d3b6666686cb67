//! The engine public API: façades over a storage backend (and, for payments, a gateway) that enforce the business
//! rules — stock sufficiency, the order status state machine, coupon policy, and payment signature verification.
mod coupon_api;
mod inventory_api;
mod order_flow_api;
pub mod order_objects;
pub mod payment_objects;
mod payments_api;

pub use coupon_api::CouponApi;
pub use inventory_api::{InventoryApi, DEFAULT_LOW_STOCK_THRESHOLD};
pub use order_flow_api::OrderFlowApi;
pub use payments_api::PaymentsApi;
