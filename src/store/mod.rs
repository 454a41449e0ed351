//! Table store behind the checkout flow.
//!
//! Every call is a single select, insert, update or delete against one of the
//! storefront tables (`shipping_addresses`, `cart_items`, `coupons`, `orders`,
//! `order_items`, `reviews`). [`PgStore`] talks to PostgreSQL, [`MemoryStore`]
//! keeps the same tables in process.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::aggregates::{CartItem, Coupon, Order, OrderItem, OrderStatus, Review, ShippingAddress};
use crate::domain::value_objects::CouponCode;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A row could not be mapped back into the domain model.
    #[error("Data corruption: {0}")]
    DataCorruption(String),

    /// A uniqueness constraint rejected the write.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[async_trait]
pub trait CheckoutStore: Send + Sync {
    /// All addresses of `user_id`, default first, then newest first.
    async fn list_addresses(&self, user_id: Uuid) -> StoreResult<Vec<ShippingAddress>>;
    /// Inserts `address`; when it is the default, clears the flag on the user's other addresses.
    async fn insert_address(&self, address: &ShippingAddress) -> StoreResult<()>;

    async fn load_cart(&self, user_id: Uuid) -> StoreResult<Vec<CartItem>>;
    /// Inserts the line or replaces the stored one for the same product.
    async fn upsert_cart_item(&self, user_id: Uuid, item: &CartItem) -> StoreResult<()>;
    /// Returns whether a line was removed.
    async fn remove_cart_item(&self, user_id: Uuid, product_id: Uuid) -> StoreResult<bool>;
    async fn clear_cart(&self, user_id: Uuid) -> StoreResult<()>;

    async fn find_coupon(&self, code: &CouponCode) -> StoreResult<Option<Coupon>>;
    async fn increment_coupon_usage(&self, coupon_id: Uuid) -> StoreResult<()>;

    async fn insert_order(&self, order: &Order) -> StoreResult<()>;
    async fn insert_order_items(&self, items: &[OrderItem]) -> StoreResult<()>;
    async fn delete_order(&self, order_id: Uuid) -> StoreResult<()>;
    /// Orders of `user_id`, newest first.
    async fn list_orders(&self, user_id: Uuid) -> StoreResult<Vec<Order>>;
    async fn find_order(&self, order_id: Uuid) -> StoreResult<Option<Order>>;
    async fn list_order_items(&self, order_id: Uuid) -> StoreResult<Vec<OrderItem>>;
    /// Moves the order from `from` to `to`. Returns false, changing nothing, when
    /// the stored status is no longer `from`.
    async fn update_order_status(&self, order_id: Uuid, from: OrderStatus, to: OrderStatus) -> StoreResult<bool>;

    /// Fails with [`StoreError::Conflict`] when the user already reviewed the product on this order.
    async fn insert_review(&self, review: &Review) -> StoreResult<()>;
}
