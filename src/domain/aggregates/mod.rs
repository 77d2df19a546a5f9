//! Aggregates module
pub mod cart;
pub mod order;
pub mod product;
pub mod user;
pub mod vendor_order;

pub use cart::{Cart, CartLine};
pub use order::{Order, OrderItem, OrderStatus, PaymentStatus, TransitionError, PAYMENT_METHOD_COD};
pub use product::{Product, ProductStatus, Variant};
pub use user::{Actor, Address, User, UserRole, UserStatus};
pub use vendor_order::VendorOrder;
