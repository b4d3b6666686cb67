//! Storefront Engine
//!
//! The Storefront Engine is the order, inventory and payment core of the saree storefront. It is transport-agnostic:
//! the HTTP controllers, authentication and email/SMS rendering all live upstream and talk to this library through
//! its public APIs.
//!
//! The library is divided into two main sections:
//! 1. Database management and control ([`mod@traits`] and the SQLite backend). Backends implement the storage traits
//!    defined in the `traits` module; the bundled [`SqliteDatabase`] is the reference implementation. You should never
//!    need to access the database directly. Instead, use the public API facades. The exception is the data types used
//!    in the database. These are defined in the `db_types` module and are public.
//! 2. The engine public API ([`mod@sfe_api`]): [`OrderFlowApi`] for order placement and lifecycle transitions,
//!    [`InventoryApi`] for stock adjustments and the stock ledger, [`PaymentsApi`] for gateway payments, signature
//!    verification and refunds, and [`CouponApi`] for discount codes.
//!
//! The engine also provides a set of events that can be subscribed to. These events are emitted when certain actions
//! occur within the engine, for example when an order is placed or paid. Notification delivery (email, SMS) hangs off
//! these hooks and is strictly fire-and-forget: a failing handler never rolls back the state change that triggered it.
pub mod db_types;
pub mod events;
pub mod helpers;
mod sfe_api;
pub mod traits;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use sfe_api::{
    order_objects,
    payment_objects,
    CouponApi,
    InventoryApi,
    OrderFlowApi,
    PaymentsApi,
    DEFAULT_LOW_STOCK_THRESHOLD,
};
pub use traits::{
    CouponError,
    CouponManagement,
    GatewayError,
    InventoryError,
    InventoryManagement,
    OrderFlowError,
    OrderManagement,
    OrderQueryError,
    PaymentApiError,
    PaymentProvider,
    StorefrontDatabase,
};
