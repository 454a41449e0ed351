//! Checkout orchestration: addresses, cart, coupons, quotes and order placement.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::domain::aggregates::{AppliedCoupon, Cart, CartError, CartItem, CouponError, NewAddress, Order, OrderDraft, OrderItem, ShippingAddress};
use crate::domain::pricing::{DeliveryOption, PaymentMethod, PriceBreakdown, PricingConfig};
use crate::domain::value_objects::{CouponCode, Money};
use crate::services::EventBus;
use crate::store::CheckoutStore;
use crate::{CheckoutError, Result};

/// Options that change the price of the current cart.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuoteRequest {
    #[serde(default)]
    pub delivery_option: DeliveryOption,
    #[serde(default)]
    pub gift_wrap: bool,
    #[serde(default)]
    pub coupon_code: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApplyCouponRequest {
    pub code: String,
    #[serde(default)]
    pub delivery_option: DeliveryOption,
    #[serde(default)]
    pub gift_wrap: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CouponQuote {
    pub coupon: AppliedCoupon,
    pub totals: PriceBreakdown,
}

/// The submitted checkout form. Selections stay optional so a missing one can
/// be reported by name instead of as a decoding failure.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct PlaceOrderRequest {
    #[serde(default)]
    pub shipping_address_id: Option<Uuid>,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub delivery_option: DeliveryOption,
    #[serde(default)]
    pub gift_wrap: bool,
    #[validate(length(max = 200, message = "Gift message is too long"))]
    #[serde(default)]
    pub gift_message: Option<String>,
    #[serde(default)]
    pub coupon_code: Option<String>,
}

impl PlaceOrderRequest {
    fn check(&self) -> Result<()> {
        self.validate()?;
        if !self.gift_wrap && non_blank(self.gift_message.as_deref()).is_some() {
            return Err(CheckoutError::Validation("gift_message: Gift message requires gift wrap".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderReceipt {
    pub order_id: Uuid,
    pub total: Money,
    pub estimated_delivery: NaiveDate,
    /// Page the client should navigate to next.
    pub redirect_to: String,
}

pub struct CheckoutService {
    store: Arc<dyn CheckoutStore>,
    pricing: PricingConfig,
    events: EventBus,
}

impl CheckoutService {
    pub fn new(store: Arc<dyn CheckoutStore>, pricing: PricingConfig, events: EventBus) -> Self {
        Self { store, pricing, events }
    }

    pub fn pricing(&self) -> &PricingConfig { &self.pricing }

    pub async fn list_addresses(&self, user_id: Uuid) -> Result<Vec<ShippingAddress>> {
        Ok(self.store.list_addresses(user_id).await?)
    }

    pub async fn add_address(&self, user_id: Uuid, form: NewAddress) -> Result<ShippingAddress> {
        let form = form.normalized();
        form.validate()?;
        let first = self.store.list_addresses(user_id).await?.is_empty();
        let is_default = form.is_default || first;
        let address = form.into_address(user_id, is_default);
        self.store.insert_address(&address).await?;
        info!(%user_id, address_id = %address.id, is_default, "Shipping address added");
        Ok(address)
    }

    pub async fn view_cart(&self, user_id: Uuid) -> Result<Cart> {
        let items = self.store.load_cart(user_id).await?;
        Ok(Cart::from_items(user_id, &self.pricing.currency, items)?)
    }

    pub async fn add_to_cart(&self, user_id: Uuid, item: CartItem) -> Result<Cart> {
        let mut cart = self.view_cart(user_id).await?;
        let product_id = item.product_id;
        cart.add_item(item)?;
        let merged = cart.items().iter().find(|i| i.product_id == product_id).ok_or(CartError::ItemNotFound)?;
        self.store.upsert_cart_item(user_id, merged).await?;
        Ok(cart)
    }

    pub async fn remove_from_cart(&self, user_id: Uuid, product_id: Uuid) -> Result<Cart> {
        if !self.store.remove_cart_item(user_id, product_id).await? {
            return Err(CartError::ItemNotFound.into());
        }
        self.view_cart(user_id).await
    }

    /// Verifies a coupon against the current cart and prices the cart with it.
    pub async fn apply_coupon(&self, user_id: Uuid, request: &ApplyCouponRequest) -> Result<CouponQuote> {
        let cart = self.non_empty_cart(user_id).await?;
        let coupon = self.verify_coupon(&request.code, cart.subtotal()).await?;
        let totals = self.pricing.breakdown(cart.subtotal(), request.delivery_option, request.gift_wrap, Some(&coupon.discount))?;
        Ok(CouponQuote { coupon, totals })
    }

    pub async fn quote(&self, user_id: Uuid, request: &QuoteRequest) -> Result<PriceBreakdown> {
        let cart = self.view_cart(user_id).await?;
        let coupon = match non_blank(request.coupon_code.as_deref()) {
            Some(code) if !cart.is_empty() => Some(self.verify_coupon(code, cart.subtotal()).await?),
            _ => None,
        };
        Ok(self.pricing.breakdown(cart.subtotal(), request.delivery_option, request.gift_wrap, coupon.as_ref().map(|c| &c.discount))?)
    }

    pub async fn place_order(&self, user_id: Uuid, request: PlaceOrderRequest) -> Result<OrderReceipt> {
        let cart = self.non_empty_cart(user_id).await?;

        let address_id = request.shipping_address_id.ok_or(CheckoutError::AddressRequired)?;
        let addresses = self.store.list_addresses(user_id).await?;
        if !addresses.iter().any(|a| a.id == address_id) {
            return Err(CheckoutError::AddressNotFound);
        }
        let payment_method = request.payment_method.ok_or(CheckoutError::PaymentMethodRequired)?;
        request.check()?;

        let coupon = match non_blank(request.coupon_code.as_deref()) {
            Some(code) => Some(self.verify_coupon(code, cart.subtotal()).await?),
            None => None,
        };
        let totals = self.pricing.breakdown(cart.subtotal(), request.delivery_option, request.gift_wrap, coupon.as_ref().map(|c| &c.discount))?;

        let now = Utc::now();
        let draft = OrderDraft {
            user_id,
            shipping_address_id: address_id,
            payment_method,
            delivery_option: request.delivery_option,
            gift_wrap: request.gift_wrap,
            gift_message: if request.gift_wrap { non_blank(request.gift_message.as_deref()).map(str::to_string) } else { None },
            coupon_code: coupon.as_ref().map(|c| c.code.clone()),
            totals,
            estimated_delivery: self.pricing.estimated_delivery(now, request.delivery_option),
        };
        let mut order = Order::place(draft, now);
        let items = cart.items().iter().map(|i| OrderItem::from_cart_item(order.id, i)).collect::<std::result::Result<Vec<_>, _>>()?;

        self.store.insert_order(&order).await?;
        if let Err(e) = self.store.insert_order_items(&items).await {
            warn!(order_id = %order.id, error = %e, "Order items insert failed; removing order");
            if let Err(cleanup) = self.store.delete_order(order.id).await {
                warn!(order_id = %order.id, error = %cleanup, "Failed to remove incomplete order");
            }
            return Err(e.into());
        }

        if let Some(c) = &coupon {
            if let Err(e) = self.store.increment_coupon_usage(c.coupon_id).await {
                warn!(order_id = %order.id, coupon = %c.code, error = %e, "Failed to record coupon usage");
            }
        }
        if let Err(e) = self.store.clear_cart(user_id).await {
            warn!(order_id = %order.id, %user_id, error = %e, "Failed to clear cart after order");
        }

        info!(order_id = %order.id, %user_id, total = %order.totals.total, items = items.len(), "Order placed");
        self.events.publish(order.take_events()).await;

        Ok(OrderReceipt {
            order_id: order.id,
            total: order.totals.total.clone(),
            estimated_delivery: order.estimated_delivery,
            redirect_to: format!("/orders/{}", order.id),
        })
    }

    async fn non_empty_cart(&self, user_id: Uuid) -> Result<Cart> {
        let cart = self.view_cart(user_id).await?;
        if cart.is_empty() { return Err(CheckoutError::EmptyCart); }
        Ok(cart)
    }

    async fn verify_coupon(&self, raw: &str, subtotal: &Money) -> Result<AppliedCoupon> {
        let code = CouponCode::new(raw)?;
        let coupon = self.store.find_coupon(&code).await?.ok_or(CouponError::NotFound)?;
        Ok(coupon.verify(subtotal, Utc::now())?)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
