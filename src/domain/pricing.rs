//! Checkout price arithmetic.

use chrono::{DateTime, Days, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use crate::domain::value_objects::{Money, MoneyError};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryOption {
    #[default]
    Standard,
    Express,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod { Card, Upi, CashOnDelivery }

macro_rules! text_enum {
    ($ty:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self { $(Self::$variant => $text),+ }
            }
        }
        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(self.as_str()) }
        }
        impl std::str::FromStr for $ty {
            type Err = String;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(format!(concat!("invalid ", stringify!($ty), ": {}"), s)),
                }
            }
        }
    };
}

text_enum!(DeliveryOption { Standard => "standard", Express => "express" });
text_enum!(PaymentMethod { Card => "card", Upi => "upi", CashOnDelivery => "cash_on_delivery" });

/// Fees and delivery windows applied at checkout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PricingConfig {
    pub currency: String,
    pub free_shipping_threshold: Decimal,
    pub standard_shipping_fee: Decimal,
    pub express_shipping_fee: Decimal,
    pub gift_wrap_fee: Decimal,
    pub standard_delivery_days: u32,
    pub express_delivery_days: u32,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            currency: "USD".to_string(),
            free_shipping_threshold: Decimal::new(5000, 2),
            standard_shipping_fee: Decimal::new(499, 2),
            express_shipping_fee: Decimal::new(1499, 2),
            gift_wrap_fee: Decimal::new(350, 2),
            standard_delivery_days: 5,
            express_delivery_days: 2,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub subtotal: Money,
    pub shipping_fee: Money,
    pub gift_wrap_fee: Money,
    pub discount: Money,
    pub total: Money,
}

impl PricingConfig {
    pub fn shipping_fee(&self, subtotal: &Money, delivery: DeliveryOption) -> Money {
        if subtotal.is_zero() { return Money::zero(subtotal.currency()); }
        let fee = match delivery {
            DeliveryOption::Standard if subtotal.amount() >= self.free_shipping_threshold => Decimal::ZERO,
            DeliveryOption::Standard => self.standard_shipping_fee,
            DeliveryOption::Express => self.express_shipping_fee,
        };
        Money::new(fee, subtotal.currency())
    }

    pub fn gift_wrap_fee(&self, gift_wrap: bool) -> Money {
        Money::new(if gift_wrap { self.gift_wrap_fee } else { Decimal::ZERO }, &self.currency)
    }

    /// Total = subtotal + shipping + gift wrap - discount, never below zero.
    pub fn breakdown(&self, subtotal: &Money, delivery: DeliveryOption, gift_wrap: bool, discount: Option<&Money>) -> Result<PriceBreakdown, MoneyError> {
        let shipping_fee = self.shipping_fee(subtotal, delivery);
        let gift_wrap_fee = self.gift_wrap_fee(gift_wrap);
        let discount = discount.cloned().unwrap_or_else(|| Money::zero(subtotal.currency()));
        let total = subtotal.add(&shipping_fee)?.add(&gift_wrap_fee)?.saturating_sub(&discount)?;
        Ok(PriceBreakdown { subtotal: subtotal.clone(), shipping_fee, gift_wrap_fee, discount, total })
    }

    pub fn delivery_days(&self, delivery: DeliveryOption) -> u32 {
        match delivery {
            DeliveryOption::Standard => self.standard_delivery_days,
            DeliveryOption::Express => self.express_delivery_days,
        }
    }

    pub fn estimated_delivery(&self, placed_at: DateTime<Utc>, delivery: DeliveryOption) -> NaiveDate {
        let date = placed_at.date_naive();
        date.checked_add_days(Days::new(u64::from(self.delivery_days(delivery)))).unwrap_or(date)
    }
}
