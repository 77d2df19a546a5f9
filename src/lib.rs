//! Vendora - Multi-Vendor Storefront Core
//!
//! The cart-to-order pipeline for a multi-vendor storefront.
//!
//! ## Features
//! - Cart ledger with identity-keyed line merging
//! - Authoritative price resolution (variant and sale price precedence)
//! - Atomic checkout: one platform order plus per-vendor sub-orders
//! - Bounded fulfillment state machine with an append-only tracking ledger

pub mod cart_sync;
pub mod checkout;
pub mod domain;
pub mod fulfillment;
pub mod pricing;
pub mod store;

pub use cart_sync::CartSync;
pub use checkout::{CheckoutError, CheckoutRequest, CheckoutService, CommerceSettings, PlacedOrder};
pub use domain::aggregates::{
    Actor, Address, Cart, CartLine, Order, OrderItem, OrderStatus, PaymentStatus, Product,
    ProductStatus, TransitionError, User, UserRole, UserStatus, Variant, VendorOrder,
};
pub use domain::events::{OrderEvent, TrackingEvent};
pub use domain::value_objects::{LineKey, Money, PurchaseType};
pub use fulfillment::{FulfillmentError, FulfillmentService, StatusUpdate};
pub use pricing::{resolve_unit_price, PricingError};
pub use store::{CommerceStore, MemoryStore, PgStore, StoreError};
