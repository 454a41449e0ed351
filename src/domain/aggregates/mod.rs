//! Aggregates module
pub mod address;
pub mod cart;
pub mod coupon;
pub mod order;
pub mod review;

pub use address::{NewAddress, ShippingAddress};
pub use cart::{Cart, CartError, CartItem};
pub use coupon::{AppliedCoupon, Coupon, CouponError, DiscountType};
pub use order::{Order, OrderDraft, OrderError, OrderItem, OrderStatus, StatusInfo, TrackerStep};
pub use review::{NewReview, Review};
