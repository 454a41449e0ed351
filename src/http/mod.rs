//! HTTP API.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::domain::aggregates::{Cart, CartItem, NewAddress, NewReview, Review, ShippingAddress};
use crate::domain::pricing::PriceBreakdown;
use crate::domain::value_objects::{Money, Quantity};
use crate::services::{
    ApplyCouponRequest, CheckoutService, CouponQuote, OrderDetail, OrderReceipt, OrderService, OrderSummary,
    PlaceOrderRequest, QuoteRequest,
};
use crate::CheckoutError;

pub mod error;
pub mod extract;

pub use error::AppError;
pub use extract::{CurrentUser, USER_ID_HEADER};

type ApiResult<T> = Result<T, AppError>;

#[derive(Clone)]
pub struct AppState {
    pub checkout: Arc<CheckoutService>,
    pub orders: Arc<OrderService>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "storefront-checkout"})) }))
        .route("/api/v1/addresses", get(list_addresses).post(add_address))
        .route("/api/v1/cart", get(view_cart).post(add_to_cart))
        .route("/api/v1/cart/:product_id", delete(remove_from_cart))
        .route("/api/v1/checkout/coupon", post(apply_coupon))
        .route("/api/v1/checkout/quote", post(quote))
        .route("/api/v1/checkout", post(place_order))
        .route("/api/v1/orders", get(list_orders))
        .route("/api/v1/orders/:id", get(order_detail))
        .route("/api/v1/orders/:id/cancel", post(cancel_order))
        .route("/api/v1/orders/:id/reviews", post(submit_review))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn list_addresses(State(s): State<AppState>, CurrentUser(user): CurrentUser) -> ApiResult<Json<Vec<ShippingAddress>>> {
    Ok(Json(s.checkout.list_addresses(user).await?))
}

async fn add_address(State(s): State<AppState>, CurrentUser(user): CurrentUser, Json(form): Json<NewAddress>) -> ApiResult<(StatusCode, Json<ShippingAddress>)> {
    Ok((StatusCode::CREATED, Json(s.checkout.add_address(user, form).await?)))
}

async fn view_cart(State(s): State<AppState>, CurrentUser(user): CurrentUser) -> ApiResult<Json<Cart>> {
    Ok(Json(s.checkout.view_cart(user).await?))
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddToCartRequest {
    pub product_id: Uuid,
    #[validate(custom = "validate_product_name")]
    pub name: String,
    #[validate(custom = "validate_unit_price")]
    pub unit_price: Decimal,
    pub quantity: u32,
    #[validate(length(max = 2048, message = "Image URL is too long"))]
    #[serde(default)]
    pub image_url: Option<String>,
}

async fn add_to_cart(State(s): State<AppState>, CurrentUser(user): CurrentUser, Json(r): Json<AddToCartRequest>) -> ApiResult<Json<Cart>> {
    r.validate().map_err(CheckoutError::from)?;
    let item = CartItem {
        product_id: r.product_id,
        name: r.name.trim().to_string(),
        unit_price: Money::new(r.unit_price.normalize(), &s.checkout.pricing().currency),
        quantity: Quantity::new(r.quantity).map_err(CheckoutError::from)?,
        image_url: r.image_url,
    };
    Ok(Json(s.checkout.add_to_cart(user, item).await?))
}

fn validate_product_name(name: &str) -> Result<(), ValidationError> {
    let len = name.trim().chars().count();
    if len == 0 || len > 200 {
        return Err(invalid("name", "Product name must be 1 to 200 characters"));
    }
    Ok(())
}

/// Prices are whole cents within the range of the price columns.
fn validate_unit_price(price: &Decimal) -> Result<(), ValidationError> {
    if price.is_sign_negative() || *price > CartItem::max_unit_price() {
        return Err(invalid("unit_price", "Price is out of range"));
    }
    if price.normalize().scale() > 2 {
        return Err(invalid("unit_price", "Price cannot have more than two decimal places"));
    }
    Ok(())
}

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

async fn remove_from_cart(State(s): State<AppState>, CurrentUser(user): CurrentUser, Path(product_id): Path<Uuid>) -> ApiResult<Json<Cart>> {
    Ok(Json(s.checkout.remove_from_cart(user, product_id).await?))
}

async fn apply_coupon(State(s): State<AppState>, CurrentUser(user): CurrentUser, Json(r): Json<ApplyCouponRequest>) -> ApiResult<Json<CouponQuote>> {
    Ok(Json(s.checkout.apply_coupon(user, &r).await?))
}

async fn quote(State(s): State<AppState>, CurrentUser(user): CurrentUser, Json(r): Json<QuoteRequest>) -> ApiResult<Json<PriceBreakdown>> {
    Ok(Json(s.checkout.quote(user, &r).await?))
}

async fn place_order(State(s): State<AppState>, CurrentUser(user): CurrentUser, Json(r): Json<PlaceOrderRequest>) -> ApiResult<(StatusCode, Json<OrderReceipt>)> {
    Ok((StatusCode::CREATED, Json(s.checkout.place_order(user, r).await?)))
}

async fn list_orders(State(s): State<AppState>, CurrentUser(user): CurrentUser) -> ApiResult<Json<Vec<OrderSummary>>> {
    Ok(Json(s.orders.list_orders(user).await?))
}

async fn order_detail(State(s): State<AppState>, CurrentUser(user): CurrentUser, Path(id): Path<Uuid>) -> ApiResult<Json<OrderDetail>> {
    Ok(Json(s.orders.order_detail(user, id).await?))
}

async fn cancel_order(State(s): State<AppState>, CurrentUser(user): CurrentUser, Path(id): Path<Uuid>) -> ApiResult<Json<OrderSummary>> {
    Ok(Json(s.orders.cancel_order(user, id).await?))
}

async fn submit_review(State(s): State<AppState>, CurrentUser(user): CurrentUser, Path(id): Path<Uuid>, Json(r): Json<NewReview>) -> ApiResult<(StatusCode, Json<Review>)> {
    Ok((StatusCode::CREATED, Json(s.orders.submit_review(user, id, r).await?)))
}
