//! # Database management and control.
//!
//! This module defines the interface contracts of the storefront engine storage *backends*, plus the external
//! payment-provider contract.
//!
//! ## Traits
//! * [`StorefrontDatabase`] defines the highest level of behaviour for backends supporting the engine: order
//!   placement, lifecycle transitions and payment bookkeeping, each as a single atomic storage operation.
//! * [`InventoryManagement`] defines stock-counter mutations and the append-only stock ledger.
//! * [`OrderManagement`] provides read-only queries over orders, items and timelines.
//! * [`CouponManagement`] provides coupon lookups and usage audit queries.
//! * [`PaymentProvider`] is the contract for the external payment gateway (order registration, refunds, and the
//!   shared signature secret). It is not a storage trait; live implementations wrap the provider's HTTP API.
mod coupon_management;
mod data_objects;
mod inventory_management;
mod order_management;
mod payment_provider;
mod storefront_database;

pub use coupon_management::{CouponError, CouponManagement};
pub use data_objects::{BulkAdjustOutcome, InventorySummary, Page, StockAdjustment, StockHistoryFilter};
pub use inventory_management::{InventoryError, InventoryManagement};
pub use order_management::{OrderManagement, OrderQueryError};
pub use payment_provider::{GatewayError, GatewayOrder, GatewayOrderRequest, GatewayRefund, PaymentProvider};
pub use storefront_database::{OrderFlowError, PaymentApiError, StorefrontDatabase};
