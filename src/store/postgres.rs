//! PostgreSQL-backed store.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use super::{CheckoutStore, StoreError, StoreResult};
use crate::domain::aggregates::{CartItem, Coupon, Order, OrderItem, OrderStatus, Review, ShippingAddress};
use crate::domain::pricing::PriceBreakdown;
use crate::domain::value_objects::{CouponCode, Money, Quantity};

#[derive(Clone)]
pub struct PgStore { pool: PgPool }

impl PgStore {
    pub fn new(pool: PgPool) -> Self { Self { pool } }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new().max_connections(max_connections).connect(database_url).await?;
        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

}

#[derive(sqlx::FromRow)]
struct CartItemRow { product_id: Uuid, name: String, unit_price: Decimal, currency: String, quantity: i32, image_url: Option<String> }

impl TryFrom<CartItemRow> for CartItem {
    type Error = StoreError;
    fn try_from(r: CartItemRow) -> StoreResult<Self> {
        let quantity = u32::try_from(r.quantity).ok().and_then(|q| Quantity::new(q).ok())
            .ok_or_else(|| StoreError::DataCorruption(format!("cart quantity {} out of range", r.quantity)))?;
        Ok(CartItem { product_id: r.product_id, name: r.name, unit_price: Money::new(r.unit_price, &r.currency), quantity, image_url: r.image_url })
    }
}

#[derive(sqlx::FromRow)]
struct CouponRow {
    id: Uuid, code: String, description: Option<String>, discount_type: String, discount_value: Decimal,
    min_order_amount: Option<Decimal>, max_discount: Option<Decimal>, is_active: bool,
    valid_from: Option<DateTime<Utc>>, valid_until: Option<DateTime<Utc>>, usage_limit: Option<i32>, used_count: i32,
}

impl TryFrom<CouponRow> for Coupon {
    type Error = StoreError;
    fn try_from(r: CouponRow) -> StoreResult<Self> {
        Ok(Coupon {
            id: r.id,
            code: CouponCode::new(r.code).map_err(|e| StoreError::DataCorruption(format!("coupon code: {e}")))?,
            description: r.description,
            discount_type: r.discount_type.parse().map_err(StoreError::DataCorruption)?,
            discount_value: r.discount_value, min_order_amount: r.min_order_amount, max_discount: r.max_discount,
            is_active: r.is_active, valid_from: r.valid_from, valid_until: r.valid_until,
            usage_limit: r.usage_limit, used_count: r.used_count,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid, user_id: Uuid, shipping_address_id: Uuid, payment_method: String, delivery_option: String,
    gift_wrap: bool, gift_message: Option<String>, coupon_code: Option<String>,
    subtotal: Decimal, shipping_fee: Decimal, gift_wrap_fee: Decimal, discount: Decimal, total: Decimal, currency: String,
    status: String, estimated_delivery: NaiveDate, created_at: DateTime<Utc>, updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = StoreError;
    fn try_from(r: OrderRow) -> StoreResult<Self> {
        let money = |amount| Money::new(amount, &r.currency);
        let totals = PriceBreakdown {
            subtotal: money(r.subtotal), shipping_fee: money(r.shipping_fee), gift_wrap_fee: money(r.gift_wrap_fee),
            discount: money(r.discount), total: money(r.total),
        };
        let coupon_code = r.coupon_code.map(CouponCode::new).transpose()
            .map_err(|e| StoreError::DataCorruption(format!("order coupon code: {e}")))?;
        Ok(Order::restore(
            r.id, r.user_id, r.shipping_address_id,
            r.payment_method.parse().map_err(StoreError::DataCorruption)?,
            r.delivery_option.parse().map_err(StoreError::DataCorruption)?,
            r.gift_wrap, r.gift_message, coupon_code, totals,
            r.status.parse().map_err(StoreError::DataCorruption)?,
            r.estimated_delivery, r.created_at, r.updated_at,
        ))
    }
}

#[derive(sqlx::FromRow)]
struct OrderItemRow { id: Uuid, order_id: Uuid, product_id: Uuid, product_name: String, unit_price: Decimal, quantity: i32, line_total: Decimal, currency: String }

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = StoreError;
    fn try_from(r: OrderItemRow) -> StoreResult<Self> {
        let quantity = u32::try_from(r.quantity).map_err(|_| StoreError::DataCorruption(format!("order item quantity {}", r.quantity)))?;
        Ok(OrderItem {
            id: r.id, order_id: r.order_id, product_id: r.product_id, product_name: r.product_name,
            unit_price: Money::new(r.unit_price, &r.currency), quantity, line_total: Money::new(r.line_total, &r.currency),
        })
    }
}

const UNIQUE_VIOLATION: &str = "23505";

const ORDER_COLUMNS: &str = "id, user_id, shipping_address_id, payment_method, delivery_option, gift_wrap, gift_message, coupon_code, subtotal, shipping_fee, gift_wrap_fee, discount, total, currency, status, estimated_delivery, created_at, updated_at";

#[async_trait]
impl CheckoutStore for PgStore {
    async fn list_addresses(&self, user_id: Uuid) -> StoreResult<Vec<ShippingAddress>> {
        let rows = sqlx::query_as::<_, ShippingAddress>("SELECT * FROM shipping_addresses WHERE user_id = $1 ORDER BY is_default DESC, created_at DESC")
            .bind(user_id).fetch_all(&self.pool).await?;
        Ok(rows)
    }

    async fn insert_address(&self, a: &ShippingAddress) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        if a.is_default {
            sqlx::query("UPDATE shipping_addresses SET is_default = FALSE WHERE user_id = $1").bind(a.user_id).execute(&mut *tx).await?;
        }
        sqlx::query("INSERT INTO shipping_addresses (id, user_id, full_name, phone, address_line1, address_line2, city, state, postal_code, country, is_default, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)")
            .bind(a.id).bind(a.user_id).bind(&a.full_name).bind(&a.phone).bind(&a.address_line1).bind(&a.address_line2)
            .bind(&a.city).bind(&a.state).bind(&a.postal_code).bind(&a.country).bind(a.is_default).bind(a.created_at)
            .execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn load_cart(&self, user_id: Uuid) -> StoreResult<Vec<CartItem>> {
        sqlx::query_as::<_, CartItemRow>("SELECT product_id, name, unit_price, currency, quantity, image_url FROM cart_items WHERE user_id = $1 ORDER BY added_at")
            .bind(user_id).fetch_all(&self.pool).await?
            .into_iter().map(CartItem::try_from).collect()
    }

    async fn upsert_cart_item(&self, user_id: Uuid, item: &CartItem) -> StoreResult<()> {
        sqlx::query("INSERT INTO cart_items (user_id, product_id, name, unit_price, currency, quantity, image_url, added_at) VALUES ($1, $2, $3, $4, $5, $6, $7, NOW()) ON CONFLICT (user_id, product_id) DO UPDATE SET name = $3, unit_price = $4, currency = $5, quantity = $6, image_url = $7")
            .bind(user_id).bind(item.product_id).bind(&item.name).bind(item.unit_price.amount()).bind(item.unit_price.currency())
            .bind(item.quantity.value() as i32).bind(&item.image_url)
            .execute(&self.pool).await?;
        Ok(())
    }

    async fn remove_cart_item(&self, user_id: Uuid, product_id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_id = $2").bind(user_id).bind(product_id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn clear_cart(&self, user_id: Uuid) -> StoreResult<()> {
        sqlx::query("DELETE FROM cart_items WHERE user_id = $1").bind(user_id).execute(&self.pool).await?;
        Ok(())
    }

    async fn find_coupon(&self, code: &CouponCode) -> StoreResult<Option<Coupon>> {
        sqlx::query_as::<_, CouponRow>("SELECT * FROM coupons WHERE code = $1")
            .bind(code.as_str()).fetch_optional(&self.pool).await?
            .map(Coupon::try_from).transpose()
    }

    async fn increment_coupon_usage(&self, coupon_id: Uuid) -> StoreResult<()> {
        sqlx::query("UPDATE coupons SET used_count = used_count + 1 WHERE id = $1").bind(coupon_id).execute(&self.pool).await?;
        Ok(())
    }

    async fn insert_order(&self, o: &Order) -> StoreResult<()> {
        let t = &o.totals;
        sqlx::query(&format!("INSERT INTO orders ({ORDER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)"))
            .bind(o.id).bind(o.user_id).bind(o.shipping_address_id).bind(o.payment_method.as_str()).bind(o.delivery_option.as_str())
            .bind(o.gift_wrap).bind(&o.gift_message).bind(o.coupon_code.as_ref().map(CouponCode::as_str))
            .bind(t.subtotal.amount()).bind(t.shipping_fee.amount()).bind(t.gift_wrap_fee.amount()).bind(t.discount.amount()).bind(t.total.amount())
            .bind(t.total.currency()).bind(o.status.as_str()).bind(o.estimated_delivery).bind(o.created_at).bind(o.updated_at)
            .execute(&self.pool).await?;
        Ok(())
    }

    async fn insert_order_items(&self, items: &[OrderItem]) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        for i in items {
            sqlx::query("INSERT INTO order_items (id, order_id, product_id, product_name, unit_price, quantity, line_total, currency) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)")
                .bind(i.id).bind(i.order_id).bind(i.product_id).bind(&i.product_name).bind(i.unit_price.amount())
                .bind(i.quantity as i32).bind(i.line_total.amount()).bind(i.unit_price.currency())
                .execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn delete_order(&self, order_id: Uuid) -> StoreResult<()> {
        sqlx::query("DELETE FROM orders WHERE id = $1").bind(order_id).execute(&self.pool).await?;
        Ok(())
    }

    async fn list_orders(&self, user_id: Uuid) -> StoreResult<Vec<Order>> {
        sqlx::query_as::<_, OrderRow>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at DESC"))
            .bind(user_id).fetch_all(&self.pool).await?
            .into_iter().map(Order::try_from).collect()
    }

    async fn find_order(&self, order_id: Uuid) -> StoreResult<Option<Order>> {
        sqlx::query_as::<_, OrderRow>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(order_id).fetch_optional(&self.pool).await?
            .map(Order::try_from).transpose()
    }

    async fn list_order_items(&self, order_id: Uuid) -> StoreResult<Vec<OrderItem>> {
        sqlx::query_as::<_, OrderItemRow>("SELECT id, order_id, product_id, product_name, unit_price, quantity, line_total, currency FROM order_items WHERE order_id = $1 ORDER BY id")
            .bind(order_id).fetch_all(&self.pool).await?
            .into_iter().map(OrderItem::try_from).collect()
    }

    async fn update_order_status(&self, order_id: Uuid, from: OrderStatus, to: OrderStatus) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE orders SET status = $3, updated_at = NOW() WHERE id = $1 AND status = $2")
            .bind(order_id).bind(from.as_str()).bind(to.as_str()).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_review(&self, r: &Review) -> StoreResult<()> {
        sqlx::query("INSERT INTO reviews (id, user_id, order_id, product_id, rating, comment, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7)")
            .bind(r.id).bind(r.user_id).bind(r.order_id).bind(r.product_id).bind(r.rating).bind(&r.comment).bind(r.created_at)
            .execute(&self.pool).await
            .map_err(|e| {
                if matches!(&e, sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION)) {
                    StoreError::Conflict(format!("review of {} on order {}", r.product_id, r.order_id))
                } else {
                    StoreError::Database(e)
                }
            })?;
        Ok(())
    }
}
