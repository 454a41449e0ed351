//! Domain events
use serde::Serialize;
use uuid::Uuid;
use crate::domain::value_objects::{CouponCode, Money};

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "aggregate", rename_all = "snake_case")]
pub enum DomainEvent {
    Order(OrderEvent),
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OrderEvent {
    Placed { order_id: Uuid, user_id: Uuid, total: Money, coupon_code: Option<CouponCode> },
    Cancelled { order_id: Uuid, user_id: Uuid },
}

impl DomainEvent {
    /// NATS subject the event is published on.
    pub fn subject(&self) -> String {
        match self {
            Self::Order(OrderEvent::Placed { .. }) => "checkout.orders.placed".to_string(),
            Self::Order(OrderEvent::Cancelled { .. }) => "checkout.orders.cancelled".to_string(),
        }
    }
}
