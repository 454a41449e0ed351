//! In-process store with the same table semantics as PostgreSQL.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{CheckoutStore, StoreError, StoreResult};
use crate::domain::aggregates::address::sort_for_display;
use crate::domain::aggregates::{CartItem, Coupon, Order, OrderItem, OrderStatus, Review, ShippingAddress};
use crate::domain::value_objects::CouponCode;

#[derive(Default)]
struct Tables {
    addresses: Vec<ShippingAddress>,
    carts: HashMap<Uuid, Vec<CartItem>>,
    coupons: HashMap<CouponCode, Coupon>,
    orders: Vec<Order>,
    order_items: Vec<OrderItem>,
    reviews: Vec<Review>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    fail_order_items: AtomicBool,
    fail_clear_cart: AtomicBool,
    status_race: Mutex<Option<OrderStatus>>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    pub async fn insert_coupon(&self, coupon: Coupon) {
        self.tables.write().await.coupons.insert(coupon.code.clone(), coupon);
    }

    /// Makes the next `insert_order_items` call fail.
    pub fn fail_next_order_items(&self) { self.fail_order_items.store(true, Ordering::SeqCst); }

    /// Makes the next `clear_cart` call fail.
    pub fn fail_next_clear_cart(&self) { self.fail_clear_cart.store(true, Ordering::SeqCst); }

    /// Sets the order to `status` right before the next `update_order_status`,
    /// as a concurrent back-office write would.
    pub fn change_status_before_next_update(&self, status: OrderStatus) {
        if let Ok(mut slot) = self.status_race.lock() { *slot = Some(status); }
    }

    fn tripped(flag: &AtomicBool, what: &str) -> StoreResult<()> {
        if flag.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!("{what} rejected")));
        }
        Ok(())
    }
}

#[async_trait]
impl CheckoutStore for MemoryStore {
    async fn list_addresses(&self, user_id: Uuid) -> StoreResult<Vec<ShippingAddress>> {
        let tables = self.tables.read().await;
        let mut list: Vec<_> = tables.addresses.iter().filter(|a| a.user_id == user_id).cloned().collect();
        sort_for_display(&mut list);
        Ok(list)
    }

    async fn insert_address(&self, address: &ShippingAddress) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if address.is_default {
            for a in tables.addresses.iter_mut().filter(|a| a.user_id == address.user_id) { a.is_default = false; }
        }
        tables.addresses.push(address.clone());
        Ok(())
    }

    async fn load_cart(&self, user_id: Uuid) -> StoreResult<Vec<CartItem>> {
        Ok(self.tables.read().await.carts.get(&user_id).cloned().unwrap_or_default())
    }

    async fn upsert_cart_item(&self, user_id: Uuid, item: &CartItem) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let cart = tables.carts.entry(user_id).or_default();
        match cart.iter_mut().find(|i| i.product_id == item.product_id) {
            Some(existing) => *existing = item.clone(),
            None => cart.push(item.clone()),
        }
        Ok(())
    }

    async fn remove_cart_item(&self, user_id: Uuid, product_id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let Some(cart) = tables.carts.get_mut(&user_id) else { return Ok(false) };
        let before = cart.len();
        cart.retain(|i| i.product_id != product_id);
        Ok(cart.len() != before)
    }

    async fn clear_cart(&self, user_id: Uuid) -> StoreResult<()> {
        Self::tripped(&self.fail_clear_cart, "clear_cart")?;
        self.tables.write().await.carts.remove(&user_id);
        Ok(())
    }

    async fn find_coupon(&self, code: &CouponCode) -> StoreResult<Option<Coupon>> {
        Ok(self.tables.read().await.coupons.get(code).cloned())
    }

    async fn increment_coupon_usage(&self, coupon_id: Uuid) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if let Some(c) = tables.coupons.values_mut().find(|c| c.id == coupon_id) { c.used_count += 1; }
        Ok(())
    }

    async fn insert_order(&self, order: &Order) -> StoreResult<()> {
        let mut stored = order.clone();
        stored.take_events();
        self.tables.write().await.orders.push(stored);
        Ok(())
    }

    async fn insert_order_items(&self, items: &[OrderItem]) -> StoreResult<()> {
        Self::tripped(&self.fail_order_items, "insert_order_items")?;
        self.tables.write().await.order_items.extend_from_slice(items);
        Ok(())
    }

    async fn delete_order(&self, order_id: Uuid) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables.order_items.retain(|i| i.order_id != order_id);
        tables.orders.retain(|o| o.id != order_id);
        Ok(())
    }

    async fn list_orders(&self, user_id: Uuid) -> StoreResult<Vec<Order>> {
        let tables = self.tables.read().await;
        let mut list: Vec<_> = tables.orders.iter().filter(|o| o.user_id == user_id).cloned().collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(list)
    }

    async fn find_order(&self, order_id: Uuid) -> StoreResult<Option<Order>> {
        Ok(self.tables.read().await.orders.iter().find(|o| o.id == order_id).cloned())
    }

    async fn list_order_items(&self, order_id: Uuid) -> StoreResult<Vec<OrderItem>> {
        Ok(self.tables.read().await.order_items.iter().filter(|i| i.order_id == order_id).cloned().collect())
    }

    async fn update_order_status(&self, order_id: Uuid, from: OrderStatus, to: OrderStatus) -> StoreResult<bool> {
        let raced = self.status_race.lock().map_err(|_| StoreError::Unavailable("status hook poisoned".into()))?.take();
        let mut tables = self.tables.write().await;
        let Some(order) = tables.orders.iter_mut().find(|o| o.id == order_id) else { return Ok(false) };
        if let Some(status) = raced { order.status = status; }
        if order.status != from { return Ok(false); }
        order.status = to;
        order.updated_at = Utc::now();
        Ok(true)
    }

    async fn insert_review(&self, review: &Review) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.reviews.iter().any(|r| r.user_id == review.user_id && r.order_id == review.order_id && r.product_id == review.product_id) {
            return Err(StoreError::Conflict(format!("review of {} on order {}", review.product_id, review.order_id)));
        }
        tables.reviews.push(review.clone());
        Ok(())
    }
}
