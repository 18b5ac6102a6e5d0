//! Domain models for the storefront API.
//!
//! Database rows are converted into these types by the repositories in
//! [`crate::db`]; route handlers serialise them straight to JSON.

pub mod order;
pub mod product;
pub mod user;

pub use order::{
    Customer, Delivery, DeliveryAgent, Order, OrderItem, PaymentResult, ShippingAddress,
    StatusChange, TrackingStep,
};
pub use product::{LOW_STOCK_THRESHOLD, Product, ProductDraft, ProductInput, ProductValidationError};
pub use user::{Address, AddressInput, CartLine, User};
