//! Coupon Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use crate::domain::value_objects::{CouponCode, Money};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType { Percentage, Fixed }

impl std::fmt::Display for DiscountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self { Self::Percentage => write!(f, "percentage"), Self::Fixed => write!(f, "fixed") }
    }
}

impl std::str::FromStr for DiscountType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "percentage" => Ok(Self::Percentage),
            "fixed" => Ok(Self::Fixed),
            _ => Err(format!("invalid discount type: {s}")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coupon {
    pub id: Uuid,
    pub code: CouponCode,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    /// Percent (0-100) for percentage coupons, currency amount for fixed ones.
    pub discount_value: Decimal,
    pub min_order_amount: Option<Decimal>,
    pub max_discount: Option<Decimal>,
    pub is_active: bool,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub usage_limit: Option<i32>,
    pub used_count: i32,
}

/// A coupon that passed verification, with the discount it grants.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AppliedCoupon {
    pub coupon_id: Uuid,
    pub code: CouponCode,
    pub description: Option<String>,
    pub discount: Money,
}

impl Coupon {
    /// Checks the coupon against the cart subtotal at `now` and computes its discount.
    pub fn verify(&self, subtotal: &Money, now: DateTime<Utc>) -> Result<AppliedCoupon, CouponError> {
        if !self.is_active { return Err(CouponError::Inactive); }
        if self.valid_from.is_some_and(|from| now < from) { return Err(CouponError::NotYetValid); }
        if self.valid_until.is_some_and(|until| now > until) { return Err(CouponError::Expired); }
        if self.usage_limit.is_some_and(|limit| self.used_count >= limit) { return Err(CouponError::UsageLimitReached); }
        if let Some(minimum) = self.min_order_amount {
            if subtotal.amount() < minimum {
                return Err(CouponError::MinimumNotMet { minimum: Money::new(minimum, subtotal.currency()) });
            }
        }
        Ok(AppliedCoupon {
            coupon_id: self.id,
            code: self.code.clone(),
            description: self.description.clone(),
            discount: self.discount_for(subtotal),
        })
    }

    pub fn discount_for(&self, subtotal: &Money) -> Money {
        let raw = match self.discount_type {
            DiscountType::Percentage => {
                let pct = subtotal.percent(self.discount_value);
                match self.max_discount {
                    Some(cap) => pct.min(Money::new(cap, subtotal.currency())),
                    None => pct,
                }
            }
            DiscountType::Fixed => Money::new(self.discount_value, subtotal.currency()),
        };
        raw.min(subtotal.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CouponError {
    #[error("Invalid coupon code")]
    NotFound,
    #[error("This coupon is no longer active")]
    Inactive,
    #[error("This coupon is not valid yet")]
    NotYetValid,
    #[error("This coupon has expired")]
    Expired,
    #[error("This coupon has reached its usage limit")]
    UsageLimitReached,
    #[error("Minimum order amount of {minimum} required for this coupon")]
    MinimumNotMet { minimum: Money },
}
