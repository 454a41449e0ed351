//! Order history, status tracking, cancellation and reviews.

use std::sync::Arc;

use serde::Serialize;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::domain::aggregates::{NewReview, Order, OrderItem, OrderStatus, Review, StatusInfo, TrackerStep};
use crate::services::EventBus;
use crate::store::{CheckoutStore, StoreError};
use crate::{CheckoutError, OrderError, Result};

#[derive(Debug, Clone, Serialize)]
pub struct OrderSummary {
    #[serde(flatten)]
    pub order: Order,
    pub status_info: StatusInfo,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub status_info: StatusInfo,
    pub tracker: Vec<TrackerStep>,
}

pub struct OrderService {
    store: Arc<dyn CheckoutStore>,
    events: EventBus,
}

impl OrderService {
    pub fn new(store: Arc<dyn CheckoutStore>, events: EventBus) -> Self {
        Self { store, events }
    }

    pub async fn list_orders(&self, user_id: Uuid) -> Result<Vec<OrderSummary>> {
        let orders = self.store.list_orders(user_id).await?;
        Ok(orders.into_iter().map(|order| OrderSummary { status_info: order.status.info(), order }).collect())
    }

    pub async fn order_detail(&self, user_id: Uuid, order_id: Uuid) -> Result<OrderDetail> {
        let order = self.owned_order(user_id, order_id).await?;
        let items = self.store.list_order_items(order.id).await?;
        Ok(OrderDetail { status_info: order.status.info(), tracker: order.status.tracker(), order, items })
    }

    pub async fn cancel_order(&self, user_id: Uuid, order_id: Uuid) -> Result<OrderSummary> {
        let mut order = self.owned_order(user_id, order_id).await?;
        let seen = order.status;
        order.cancel()?;
        if !self.store.update_order_status(order.id, seen, order.status).await? {
            let current = self.store.find_order(order.id).await?.map_or(seen, |o| o.status);
            return Err(OrderError::CannotCancel(current).into());
        }
        info!(%order_id, %user_id, "Order cancelled");
        self.events.publish(order.take_events()).await;
        Ok(OrderSummary { status_info: order.status.info(), order })
    }

    pub async fn submit_review(&self, user_id: Uuid, order_id: Uuid, review: NewReview) -> Result<Review> {
        review.validate()?;
        let order = self.owned_order(user_id, order_id).await?;
        if order.status != OrderStatus::Delivered {
            return Err(CheckoutError::ReviewNotAllowed);
        }
        let items = self.store.list_order_items(order.id).await?;
        if !items.iter().any(|i| i.product_id == review.product_id) {
            return Err(CheckoutError::ProductNotInOrder);
        }
        let review = review.into_review(user_id, order.id);
        match self.store.insert_review(&review).await {
            Ok(()) => {}
            Err(StoreError::Conflict(_)) => return Err(CheckoutError::DuplicateReview),
            Err(e) => return Err(e.into()),
        }
        info!(%order_id, product_id = %review.product_id, rating = review.rating, "Review submitted");
        Ok(review)
    }

    /// Orders belonging to someone else are reported as missing.
    async fn owned_order(&self, user_id: Uuid, order_id: Uuid) -> Result<Order> {
        match self.store.find_order(order_id).await? {
            Some(order) if order.user_id == user_id => Ok(order),
            _ => Err(CheckoutError::OrderNotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::OrderDraft;
    use crate::domain::events::{DomainEvent, OrderEvent};
    use crate::domain::pricing::{DeliveryOption, PaymentMethod, PricingConfig};
    use crate::domain::value_objects::Money;
    use crate::store::MemoryStore;
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;

    async fn placed(store: &MemoryStore, user_id: Uuid, age_days: i64, status: OrderStatus) -> (Order, Uuid) {
        let pricing = PricingConfig::default();
        let subtotal = Money::usd(Decimal::new(25, 0));
        let at = Utc::now() - Duration::days(age_days);
        let mut order = Order::place(OrderDraft {
            user_id, shipping_address_id: Uuid::new_v4(), payment_method: PaymentMethod::Card,
            delivery_option: DeliveryOption::Standard, gift_wrap: false, gift_message: None, coupon_code: None,
            totals: pricing.breakdown(&subtotal, DeliveryOption::Standard, false, None).unwrap(),
            estimated_delivery: pricing.estimated_delivery(at, DeliveryOption::Standard),
        }, at);
        order.status = status;
        let product_id = Uuid::new_v4();
        store.insert_order(&order).await.unwrap();
        store.insert_order_items(&[OrderItem {
            id: Uuid::new_v4(), order_id: order.id, product_id, product_name: "Teapot".into(),
            unit_price: subtotal.clone(), quantity: 1, line_total: subtotal,
        }]).await.unwrap();
        (order, product_id)
    }

    fn service(store: &Arc<MemoryStore>) -> (OrderService, EventBus) {
        let events = EventBus::recording();
        (OrderService::new(store.clone(), events.clone()), events)
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let store = Arc::new(MemoryStore::new());
        let user = Uuid::new_v4();
        let (old, _) = placed(&store, user, 3, OrderStatus::Delivered).await;
        let (new, _) = placed(&store, user, 0, OrderStatus::Pending).await;
        placed(&store, Uuid::new_v4(), 1, OrderStatus::Pending).await;
        let (svc, _) = service(&store);
        let list = svc.list_orders(user).await.unwrap();
        assert_eq!(list.iter().map(|s| s.order.id).collect::<Vec<_>>(), vec![new.id, old.id]);
        assert_eq!(list[1].status_info.label, "Delivered");
    }

    #[tokio::test]
    async fn test_detail_hides_other_users_orders() {
        let store = Arc::new(MemoryStore::new());
        let owner = Uuid::new_v4();
        let (order, _) = placed(&store, owner, 0, OrderStatus::Shipped).await;
        let (svc, _) = service(&store);

        let detail = svc.order_detail(owner, order.id).await.unwrap();
        assert_eq!(detail.items.len(), 1);
        assert_eq!(detail.tracker.iter().filter(|t| t.reached).count(), 3);
        assert!(matches!(svc.order_detail(Uuid::new_v4(), order.id).await, Err(CheckoutError::OrderNotFound)));
    }

    #[tokio::test]
    async fn test_cancel() {
        let store = Arc::new(MemoryStore::new());
        let user = Uuid::new_v4();
        let (pending, _) = placed(&store, user, 0, OrderStatus::Pending).await;
        let (shipped, _) = placed(&store, user, 0, OrderStatus::Shipped).await;
        let (svc, events) = service(&store);

        let summary = svc.cancel_order(user, pending.id).await.unwrap();
        assert_eq!(summary.order.status, OrderStatus::Cancelled);
        assert_eq!(store.find_order(pending.id).await.unwrap().unwrap().status, OrderStatus::Cancelled);
        assert!(matches!(events.recorded().await.as_slice(), [DomainEvent::Order(OrderEvent::Cancelled { .. })]));

        assert!(matches!(svc.cancel_order(user, shipped.id).await, Err(CheckoutError::Order(OrderError::CannotCancel(OrderStatus::Shipped)))));
    }

    #[tokio::test]
    async fn test_cancel_loses_to_concurrent_shipment() {
        let store = Arc::new(MemoryStore::new());
        let user = Uuid::new_v4();
        let (order, _) = placed(&store, user, 0, OrderStatus::Confirmed).await;
        let (svc, events) = service(&store);

        store.change_status_before_next_update(OrderStatus::Shipped);
        assert!(matches!(svc.cancel_order(user, order.id).await, Err(CheckoutError::Order(OrderError::CannotCancel(OrderStatus::Shipped)))));
        assert_eq!(store.find_order(order.id).await.unwrap().unwrap().status, OrderStatus::Shipped);
        assert!(events.recorded().await.is_empty());
    }

    #[tokio::test]
    async fn test_status_update_checks_current_status() {
        let store = MemoryStore::new();
        let (order, _) = placed(&store, Uuid::new_v4(), 0, OrderStatus::Pending).await;
        assert!(store.update_order_status(order.id, OrderStatus::Pending, OrderStatus::Shipped).await.unwrap());
        assert!(!store.update_order_status(order.id, OrderStatus::Pending, OrderStatus::Cancelled).await.unwrap());
        assert_eq!(store.find_order(order.id).await.unwrap().unwrap().status, OrderStatus::Shipped);
    }

    #[tokio::test]
    async fn test_review_rules() {
        let store = Arc::new(MemoryStore::new());
        let user = Uuid::new_v4();
        let (delivered, product) = placed(&store, user, 5, OrderStatus::Delivered).await;
        let (pending, pending_product) = placed(&store, user, 0, OrderStatus::Pending).await;
        let (svc, _) = service(&store);
        let review = |product_id, rating| NewReview { product_id, rating, comment: Some("Lovely".into()) };

        assert!(matches!(svc.submit_review(user, pending.id, review(pending_product, 5)).await, Err(CheckoutError::ReviewNotAllowed)));
        assert!(matches!(svc.submit_review(user, delivered.id, review(Uuid::new_v4(), 5)).await, Err(CheckoutError::ProductNotInOrder)));
        assert!(matches!(svc.submit_review(user, delivered.id, review(product, 9)).await, Err(CheckoutError::Validation(_))));

        let saved = svc.submit_review(user, delivered.id, review(product, 4)).await.unwrap();
        assert_eq!(saved.rating, 4);
        assert!(matches!(svc.submit_review(user, delivered.id, review(product, 5)).await, Err(CheckoutError::DuplicateReview)));
        assert!(matches!(store.insert_review(&review(product, 3).into_review(user, delivered.id)).await, Err(StoreError::Conflict(_))));
    }
}
