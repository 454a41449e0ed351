//! Service configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DATABASE_URL` - `PostgreSQL` connection string
//!
//! ## Optional
//! - `HOST` - Bind address (default: 0.0.0.0)
//! - `PORT` - Listen port (default: 8083)
//! - `DATABASE_MAX_CONNECTIONS` - Pool size (default: 10)
//! - `NATS_URL` - NATS server for order events
//! - `CHECKOUT_CURRENCY` - ISO 4217 code prices are charged in (default: USD)
//! - `FREE_SHIPPING_THRESHOLD` - Subtotal from which standard shipping is free (default: 50.00)
//! - `STANDARD_SHIPPING_FEE` (default: 4.99)
//! - `EXPRESS_SHIPPING_FEE` (default: 14.99)
//! - `GIFT_WRAP_FEE` (default: 3.50)
//! - `STANDARD_DELIVERY_DAYS` (default: 5)
//! - `EXPRESS_DELIVERY_DAYS` (default: 2)

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;

use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::pricing::PricingConfig;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: IpAddr,
    pub port: u16,
    pub max_connections: u32,
    pub nats_url: Option<String>,
    pub pricing: PricingConfig,
}

impl Config {
    /// Load configuration from the process environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(&lookup);
        let defaults = PricingConfig::default();

        let pricing = PricingConfig {
            currency: env.or("CHECKOUT_CURRENCY", &defaults.currency).trim().to_uppercase(),
            free_shipping_threshold: env.amount("FREE_SHIPPING_THRESHOLD", defaults.free_shipping_threshold)?,
            standard_shipping_fee: env.amount("STANDARD_SHIPPING_FEE", defaults.standard_shipping_fee)?,
            express_shipping_fee: env.amount("EXPRESS_SHIPPING_FEE", defaults.express_shipping_fee)?,
            gift_wrap_fee: env.amount("GIFT_WRAP_FEE", defaults.gift_wrap_fee)?,
            standard_delivery_days: env.parsed("STANDARD_DELIVERY_DAYS", defaults.standard_delivery_days)?,
            express_delivery_days: env.parsed("EXPRESS_DELIVERY_DAYS", defaults.express_delivery_days)?,
        };
        if pricing.currency.len() != 3 || !pricing.currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ConfigError::InvalidEnvVar("CHECKOUT_CURRENCY".to_string(), format!("{} is not an ISO 4217 code", pricing.currency)));
        }

        Ok(Self {
            database_url: env.required("DATABASE_URL")?,
            host: env.parsed("HOST", IpAddr::V4(Ipv4Addr::UNSPECIFIED))?,
            port: env.parsed("PORT", 8083)?,
            max_connections: env.parsed("DATABASE_MAX_CONNECTIONS", 10)?,
            nats_url: env.optional("NATS_URL"),
            pricing,
        })
    }

    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

struct Env<'a>(&'a dyn Fn(&str) -> Option<String>);

impl Env<'_> {
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    fn or(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    fn parsed<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.optional(key) {
            Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
            None => Ok(default),
        }
    }

    fn amount(&self, key: &str, default: Decimal) -> Result<Decimal, ConfigError> {
        let value: Decimal = self.parsed(key, default)?;
        if value.is_sign_negative() {
            return Err(ConfigError::InvalidEnvVar(key.to_string(), "must not be negative".to_string()));
        }
        Ok(value)
    }
}
