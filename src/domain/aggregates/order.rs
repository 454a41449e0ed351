//! Order Aggregate

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::domain::aggregates::cart::CartItem;
use crate::domain::events::{DomainEvent, OrderEvent};
use crate::domain::pricing::{DeliveryOption, PaymentMethod, PriceBreakdown};
use crate::domain::value_objects::{CouponCode, Money, MoneyError};

#[derive(Clone, Debug, Serialize)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub shipping_address_id: Uuid,
    pub payment_method: PaymentMethod,
    pub delivery_option: DeliveryOption,
    pub gift_wrap: bool,
    pub gift_message: Option<String>,
    pub coupon_code: Option<CouponCode>,
    pub totals: PriceBreakdown,
    pub status: OrderStatus,
    pub estimated_delivery: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub unit_price: Money,
    pub quantity: u32,
    pub line_total: Money,
}

impl OrderItem {
    pub fn from_cart_item(order_id: Uuid, item: &CartItem) -> Result<Self, MoneyError> {
        Ok(Self {
            id: Uuid::now_v7(), order_id, product_id: item.product_id, product_name: item.name.clone(),
            unit_price: item.unit_price.clone(), quantity: item.quantity.value(), line_total: item.line_total()?,
        })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Processing,
    Shipped,
    OutForDelivery,
    Delivered,
    Cancelled,
}

/// Display metadata for one order status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct StatusInfo {
    pub status: OrderStatus,
    pub label: &'static str,
    pub description: &'static str,
    /// Position on the progress tracker; `None` for statuses off the happy path.
    pub step: Option<u8>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct TrackerStep {
    pub status: OrderStatus,
    pub label: &'static str,
    pub reached: bool,
}

const STATUS_TABLE: [StatusInfo; 7] = [
    StatusInfo { status: OrderStatus::Pending, label: "Order Placed", description: "We have received your order.", step: Some(0) },
    StatusInfo { status: OrderStatus::Confirmed, label: "Confirmed", description: "Your order has been confirmed.", step: Some(1) },
    StatusInfo { status: OrderStatus::Processing, label: "Processing", description: "Your items are being packed.", step: Some(1) },
    StatusInfo { status: OrderStatus::Shipped, label: "Shipped", description: "Your order is on its way.", step: Some(2) },
    StatusInfo { status: OrderStatus::OutForDelivery, label: "Out for Delivery", description: "Your order will arrive today.", step: Some(3) },
    StatusInfo { status: OrderStatus::Delivered, label: "Delivered", description: "Your order has been delivered.", step: Some(4) },
    StatusInfo { status: OrderStatus::Cancelled, label: "Cancelled", description: "This order was cancelled.", step: None },
];

const TRACKER: [OrderStatus; 5] = [
    OrderStatus::Pending,
    OrderStatus::Confirmed,
    OrderStatus::Shipped,
    OrderStatus::OutForDelivery,
    OrderStatus::Delivered,
];

impl OrderStatus {
    pub fn info(self) -> StatusInfo {
        STATUS_TABLE.iter().copied().find(|i| i.status == self).unwrap_or(STATUS_TABLE[0])
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::OutForDelivery => "out_for_delivery",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_cancellable(self) -> bool { matches!(self, Self::Pending | Self::Confirmed) }

    /// The five tracker steps, each flagged with whether this status has reached it.
    pub fn tracker(self) -> Vec<TrackerStep> {
        let current = self.info().step;
        TRACKER.iter().map(|&s| {
            let info = s.info();
            TrackerStep { status: s, label: info.label, reached: matches!((current, info.step), (Some(c), Some(step)) if step <= c) }
        }).collect()
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(self.as_str()) }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        STATUS_TABLE.iter().map(|i| i.status).find(|st| st.as_str() == s).ok_or_else(|| format!("invalid order status: {s}"))
    }
}

/// Everything the shopper chose on the checkout form, already validated.
#[derive(Clone, Debug)]
pub struct OrderDraft {
    pub user_id: Uuid,
    pub shipping_address_id: Uuid,
    pub payment_method: PaymentMethod,
    pub delivery_option: DeliveryOption,
    pub gift_wrap: bool,
    pub gift_message: Option<String>,
    pub coupon_code: Option<CouponCode>,
    pub totals: PriceBreakdown,
    pub estimated_delivery: NaiveDate,
}

impl Order {
    pub fn place(draft: OrderDraft, now: DateTime<Utc>) -> Self {
        let mut order = Self {
            id: Uuid::now_v7(), user_id: draft.user_id, shipping_address_id: draft.shipping_address_id,
            payment_method: draft.payment_method, delivery_option: draft.delivery_option, gift_wrap: draft.gift_wrap,
            gift_message: draft.gift_message, coupon_code: draft.coupon_code, totals: draft.totals,
            status: OrderStatus::Pending, estimated_delivery: draft.estimated_delivery,
            created_at: now, updated_at: now, events: vec![],
        };
        order.raise_event(DomainEvent::Order(OrderEvent::Placed {
            order_id: order.id, user_id: order.user_id, total: order.totals.total.clone(),
            coupon_code: order.coupon_code.clone(),
        }));
        order
    }

    /// Rebuilds an order loaded from storage; raises no events.
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: Uuid, user_id: Uuid, shipping_address_id: Uuid, payment_method: PaymentMethod,
        delivery_option: DeliveryOption, gift_wrap: bool, gift_message: Option<String>,
        coupon_code: Option<CouponCode>, totals: PriceBreakdown, status: OrderStatus,
        estimated_delivery: NaiveDate, created_at: DateTime<Utc>, updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id, user_id, shipping_address_id, payment_method, delivery_option, gift_wrap, gift_message,
            coupon_code, totals, status, estimated_delivery, created_at, updated_at, events: vec![],
        }
    }

    pub fn cancel(&mut self) -> Result<(), OrderError> {
        if !self.status.is_cancellable() { return Err(OrderError::CannotCancel(self.status)); }
        self.status = OrderStatus::Cancelled;
        self.touch();
        self.raise_event(DomainEvent::Order(OrderEvent::Cancelled { order_id: self.id, user_id: self.user_id }));
        Ok(())
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum OrderError { CannotCancel(OrderStatus) }
impl std::error::Error for OrderError {}
impl std::fmt::Display for OrderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self { Self::CannotCancel(status) => write!(f, "Order can no longer be cancelled ({})", status.info().label) }
    }
}
