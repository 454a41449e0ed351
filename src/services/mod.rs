//! Application services wiring the domain to the store.
pub mod checkout;
pub mod event_bus;
pub mod orders;

pub use checkout::{ApplyCouponRequest, CheckoutService, CouponQuote, OrderReceipt, PlaceOrderRequest, QuoteRequest};
pub use event_bus::EventBus;
pub use orders::{OrderDetail, OrderService, OrderSummary};
