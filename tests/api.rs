use std::str::FromStr;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use storefront_checkout::domain::aggregates::{Coupon, DiscountType};
use storefront_checkout::domain::pricing::PricingConfig;
use storefront_checkout::domain::value_objects::CouponCode;
use storefront_checkout::http::{router, AppState, USER_ID_HEADER};
use storefront_checkout::services::{CheckoutService, EventBus, OrderService};
use storefront_checkout::MemoryStore;
use tower::ServiceExt;
use uuid::Uuid;

async fn app() -> Router {
    let store = Arc::new(MemoryStore::new());
    store.insert_coupon(Coupon {
        id: Uuid::new_v4(), code: CouponCode::new("WELCOME5").unwrap(), description: Some("$5 off".into()),
        discount_type: DiscountType::Fixed, discount_value: Decimal::new(500, 2), min_order_amount: Some(Decimal::new(20, 0)),
        max_discount: None, is_active: true, valid_from: None, valid_until: None, usage_limit: None, used_count: 0,
    }).await;
    let events = EventBus::recording();
    router(AppState {
        checkout: Arc::new(CheckoutService::new(store.clone(), PricingConfig::default(), events.clone())),
        orders: Arc::new(OrderService::new(store, events)),
    })
}

async fn send(app: &Router, method: &str, uri: &str, user: Option<Uuid>, body: Option<Value>) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        req = req.header(USER_ID_HEADER, user.to_string());
    }
    let req = match body {
        Some(b) => req.header("content-type", "application/json").body(Body::from(b.to_string())).unwrap(),
        None => req.body(Body::empty()).unwrap(),
    };
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn amount(v: &Value) -> Decimal {
    Decimal::from_str(v["amount"].as_str().expect("amount is a string")).unwrap()
}

fn address() -> Value {
    json!({
        "full_name": "Katherine Johnson", "phone": "+1 757-555-0100", "address_line1": "1 Langley Blvd",
        "city": "Hampton", "state": "VA", "postal_code": "23681", "country": "US"
    })
}

#[tokio::test]
async fn test_health() {
    let app = app().await;
    let (status, body) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_requires_user() {
    let app = app().await;
    let (status, body) = send(&app, "GET", "/api/v1/cart", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Please sign in to continue");

    let (status, _) = send(&app, "GET", "/api/v1/orders", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_checkout_flow() {
    let app = app().await;
    let user = Some(Uuid::new_v4());

    let (status, created) = send(&app, "POST", "/api/v1/addresses", user, Some(address())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["is_default"], true);
    let (_, list) = send(&app, "GET", "/api/v1/addresses", user, None).await;
    assert_eq!(list.as_array().unwrap().len(), 1);

    let mug = Uuid::new_v4();
    let (status, cart) = send(&app, "POST", "/api/v1/cart", user, Some(json!({"product_id": mug, "name": "Mug", "unit_price": "15.00", "quantity": 2}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(amount(&cart["subtotal"]), Decimal::new(30, 0));
    send(&app, "POST", "/api/v1/cart", user, Some(json!({"product_id": Uuid::new_v4(), "name": "Coaster", "unit_price": "2.50", "quantity": 4}))).await;

    let (status, quote) = send(&app, "POST", "/api/v1/checkout/coupon", user, Some(json!({"code": "welcome5", "gift_wrap": true}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(amount(&quote["coupon"]["discount"]), Decimal::new(5, 0));
    // 40.00 + 4.99 shipping + 3.50 wrap - 5.00
    assert_eq!(amount(&quote["totals"]["total"]), Decimal::new(4349, 2));

    let (status, body) = send(&app, "POST", "/api/v1/checkout/coupon", user, Some(json!({"code": "BOGUS"}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "Invalid coupon code");

    let (status, body) = send(&app, "POST", "/api/v1/checkout", user, Some(json!({"payment_method": "card"}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "Please select a shipping address");

    let order = json!({
        "shipping_address_id": created["id"], "payment_method": "card", "delivery_option": "express",
        "gift_wrap": true, "gift_message": "Enjoy!", "coupon_code": "WELCOME5"
    });
    let (status, receipt) = send(&app, "POST", "/api/v1/checkout", user, Some(order)).await;
    assert_eq!(status, StatusCode::CREATED);
    // 40.00 + 14.99 express + 3.50 wrap - 5.00
    assert_eq!(amount(&receipt["total"]), Decimal::new(5349, 2));
    let order_id = receipt["order_id"].as_str().unwrap().to_string();
    assert_eq!(receipt["redirect_to"], format!("/orders/{order_id}"));

    let (_, cart) = send(&app, "GET", "/api/v1/cart", user, None).await;
    assert!(cart["items"].as_array().unwrap().is_empty());

    let (status, detail) = send(&app, "GET", &format!("/api/v1/orders/{order_id}"), user, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["status"], "pending");
    assert_eq!(detail["status_info"]["label"], "Order Placed");
    assert_eq!(detail["items"].as_array().unwrap().len(), 2);
    assert_eq!(detail["tracker"].as_array().unwrap().len(), 5);

    let (status, _) = send(&app, "GET", &format!("/api/v1/orders/{order_id}"), Some(Uuid::new_v4()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, orders) = send(&app, "GET", "/api/v1/orders", user, None).await;
    assert_eq!(orders.as_array().unwrap().len(), 1);

    let (status, cancelled) = send(&app, "POST", &format!("/api/v1/orders/{order_id}/cancel"), user, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "cancelled");
    let (status, _) = send(&app, "POST", &format!("/api/v1/orders/{order_id}/cancel"), user, None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(&app, "POST", &format!("/api/v1/orders/{order_id}/reviews"), user, Some(json!({"product_id": mug, "rating": 5}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Reviews can only be left once an order is delivered");
}

#[tokio::test]
async fn test_empty_cart_checkout() {
    let app = app().await;
    let user = Some(Uuid::new_v4());
    let (status, body) = send(&app, "POST", "/api/v1/checkout", user, Some(json!({}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "Your cart is empty");

    let (status, quote) = send(&app, "POST", "/api/v1/checkout/quote", user, Some(json!({"delivery_option": "express"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(amount(&quote["total"]), Decimal::ZERO);
}

#[tokio::test]
async fn test_invalid_cart_quantity() {
    let app = app().await;
    let user = Some(Uuid::new_v4());
    let (status, body) = send(&app, "POST", "/api/v1/cart", user, Some(json!({"product_id": Uuid::new_v4(), "name": "Mug", "unit_price": "1.00", "quantity": 0}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "Quantity must be at least 1");

    let (status, body) = send(&app, "POST", "/api/v1/cart", user, Some(json!({"product_id": Uuid::new_v4(), "name": "Mug", "unit_price": "1.00", "quantity": 100}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "Quantity cannot exceed 99");

    let (status, _) = send(&app, "DELETE", &format!("/api/v1/cart/{}", Uuid::new_v4()), user, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cart_line_limit_on_merge() {
    let app = app().await;
    let user = Some(Uuid::new_v4());
    let mug = json!({"product_id": Uuid::new_v4(), "name": "Mug", "unit_price": "4.00", "quantity": 98});
    let (status, _) = send(&app, "POST", "/api/v1/cart", user, Some(mug.clone())).await;
    assert_eq!(status, StatusCode::OK);

    let more = json!({"product_id": mug["product_id"], "name": "Mug", "unit_price": "4.00", "quantity": 5});
    let (status, body) = send(&app, "POST", "/api/v1/cart", user, Some(more)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "Quantity cannot exceed 99");

    let (_, cart) = send(&app, "GET", "/api/v1/cart", user, None).await;
    assert_eq!(cart["items"][0]["quantity"], 98);
}

#[tokio::test]
async fn test_cart_price_limits() {
    let app = app().await;
    let user = Some(Uuid::new_v4());
    let line = |price: &str| json!({"product_id": Uuid::new_v4(), "name": "Lamp", "unit_price": price, "quantity": 2});

    let (status, body) = send(&app, "POST", "/api/v1/cart", user, Some(line("79228162514264337593543950335"))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "unit_price: Price is out of range");

    let (status, body) = send(&app, "POST", "/api/v1/cart", user, Some(line("0.333"))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "unit_price: Price cannot have more than two decimal places");

    let (status, body) = send(&app, "POST", "/api/v1/cart", user, Some(line("-1.00"))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "unit_price: Price is out of range");

    let (status, cart) = send(&app, "POST", "/api/v1/cart", user, Some(line("9999999999.99"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(amount(&cart["subtotal"]), Decimal::new(1_999_999_999_998, 2));

    let (status, cart) = send(&app, "POST", "/api/v1/cart", user, Some(line("1.500"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(amount(&cart["items"][1]["unit_price"]), Decimal::new(15, 1));
}
