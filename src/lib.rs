//! Storefront Checkout Service
//!
//! Checkout flow for a self-hosted storefront.
//!
//! ## Features
//! - Shipping address book
//! - Cart review and coupon application
//! - Delivery, gift-wrap and discount pricing
//! - Order submission
//! - Order status tracking, cancellation and reviews

use thiserror::Error;

pub mod config;
pub mod domain;
pub mod http;
pub mod services;
pub mod store;

pub use config::{Config, ConfigError};
pub use domain::aggregates::{CouponError, OrderError};
pub use store::{CheckoutStore, MemoryStore, PgStore, StoreError};

use domain::aggregates::CartError;
use domain::value_objects::{CouponCodeError, MoneyError, QuantityError};

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum CheckoutError {
    #[error("Your cart is empty")]
    EmptyCart,

    #[error("Please select a shipping address")]
    AddressRequired,

    #[error("Shipping address not found")]
    AddressNotFound,

    #[error("Please select a payment method")]
    PaymentMethodRequired,

    #[error("Order not found")]
    OrderNotFound,

    #[error("Reviews can only be left once an order is delivered")]
    ReviewNotAllowed,

    #[error("This product is not part of the order")]
    ProductNotInOrder,

    #[error("You have already reviewed this product")]
    DuplicateReview,

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Coupon(#[from] CouponError),

    #[error(transparent)]
    CouponCode(#[from] CouponCodeError),

    #[error(transparent)]
    Quantity(#[from] QuantityError),

    #[error(transparent)]
    Cart(#[from] CartError),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Pricing(#[from] MoneyError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

impl From<validator::ValidationErrors> for CheckoutError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by_key(|(name, _)| *name);
        let message = fields.iter()
            .filter_map(|(name, errs)| errs.first().map(|e| format!("{name}: {}", e.message.as_deref().unwrap_or(&e.code))))
            .collect::<Vec<_>>()
            .join("; ");
        Self::Validation(message)
    }
}

pub type Result<T> = std::result::Result<T, CheckoutError>;
