//! Cart Aggregate

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::domain::value_objects::{Money, MoneyError, Quantity, QuantityError};

#[derive(Clone, Debug, Serialize)]
pub struct Cart {
    user_id: Uuid,
    items: Vec<CartItem>,
    subtotal: Money,
    currency: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: Uuid,
    pub name: String,
    pub unit_price: Money,
    pub quantity: Quantity,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl CartItem {
    /// Largest unit price a cart line accepts, the range of the price columns.
    pub fn max_unit_price() -> Decimal { Decimal::new(999_999_999_999, 2) }

    pub fn line_total(&self) -> Result<Money, MoneyError> { self.unit_price.multiply(self.quantity.value()) }
}

impl Cart {
    pub fn new(user_id: Uuid, currency: &str) -> Self {
        Self { user_id, items: vec![], subtotal: Money::zero(currency), currency: currency.to_string() }
    }

    /// Rebuilds a cart from its stored lines, merging duplicates.
    pub fn from_items(user_id: Uuid, currency: &str, items: impl IntoIterator<Item = CartItem>) -> Result<Self, CartError> {
        let mut cart = Self::new(user_id, currency);
        for item in items { cart.add_item(item)?; }
        Ok(cart)
    }

    pub fn user_id(&self) -> Uuid { self.user_id }
    pub fn items(&self) -> &[CartItem] { &self.items }
    pub fn subtotal(&self) -> &Money { &self.subtotal }
    pub fn currency(&self) -> &str { &self.currency }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }
    pub fn item_count(&self) -> u32 { self.items.iter().map(|i| i.quantity.value()).sum() }

    /// Adds `item`, merging it into an existing line for the same product.
    /// The cart is left unchanged when the merged line or the subtotal is out of range.
    pub fn add_item(&mut self, item: CartItem) -> Result<(), CartError> {
        if item.unit_price.currency() != self.currency { return Err(CartError::CurrencyMismatch); }
        let mut items = self.items.clone();
        if let Some(existing) = items.iter_mut().find(|i| i.product_id == item.product_id) {
            existing.quantity = existing.quantity.add(item.quantity)?;
        } else {
            items.push(item);
        }
        self.subtotal = Self::sum(&self.currency, &items)?;
        self.items = items;
        Ok(())
    }

    pub fn remove_item(&mut self, product_id: Uuid) -> Result<(), CartError> {
        let before = self.items.len();
        self.items.retain(|i| i.product_id != product_id);
        if self.items.len() == before { return Err(CartError::ItemNotFound); }
        self.subtotal = Self::sum(&self.currency, &self.items)?;
        Ok(())
    }

    fn sum(currency: &str, items: &[CartItem]) -> Result<Money, CartError> {
        items.iter().try_fold(Money::zero(currency), |acc, i| -> Result<Money, CartError> { Ok(acc.add(&i.line_total()?)?) })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum CartError { ItemNotFound, CurrencyMismatch, Quantity(QuantityError), TooExpensive }
impl std::error::Error for CartError {}
impl std::fmt::Display for CartError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ItemNotFound => write!(f, "Item not found in cart"),
            Self::CurrencyMismatch => write!(f, "Item is priced in a different currency"),
            Self::Quantity(e) => write!(f, "{e}"),
            Self::TooExpensive => write!(f, "Cart total is too large"),
        }
    }
}

impl From<QuantityError> for CartError {
    fn from(e: QuantityError) -> Self { Self::Quantity(e) }
}

impl From<MoneyError> for CartError {
    fn from(e: MoneyError) -> Self {
        match e {
            MoneyError::CurrencyMismatch => Self::CurrencyMismatch,
            MoneyError::Overflow => Self::TooExpensive,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widget(product_id: Uuid, qty: u32) -> CartItem {
        CartItem { product_id, name: "Widget".into(), unit_price: Money::usd(Decimal::new(10, 0)), quantity: Quantity::new(qty).unwrap(), image_url: None }
    }

    #[test]
    fn test_merge_past_line_limit_is_rejected() {
        let pid = Uuid::new_v4();
        let mut cart = Cart::new(Uuid::new_v4(), "USD");
        cart.add_item(widget(pid, 98)).unwrap();
        assert_eq!(cart.add_item(widget(pid, 5)), Err(CartError::Quantity(QuantityError::TooLarge)));
        assert_eq!(cart.items()[0].quantity.value(), 98);
        cart.add_item(widget(pid, 1)).unwrap();
        assert_eq!(cart.item_count(), 99);
    }

    #[test]
    fn test_overflowing_subtotal_leaves_cart_unchanged() {
        let mut cart = Cart::new(Uuid::new_v4(), "USD");
        cart.add_item(widget(Uuid::new_v4(), 1)).unwrap();
        let huge = CartItem { unit_price: Money::usd(Decimal::MAX), ..widget(Uuid::new_v4(), 2) };
        assert_eq!(cart.add_item(huge), Err(CartError::TooExpensive));
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.subtotal().amount(), Decimal::new(10, 0));
    }

    #[test]
    fn test_cart_operations() {
        let pid = Uuid::new_v4();
        let mut cart = Cart::new(Uuid::new_v4(), "USD");
        cart.add_item(widget(pid, 2)).unwrap();
        assert_eq!(cart.item_count(), 2);
        assert_eq!(cart.subtotal().amount(), Decimal::new(20, 0));
        cart.add_item(widget(pid, 1)).unwrap();
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity.value(), 3); // Merged
        cart.remove_item(pid).unwrap();
        assert!(cart.is_empty());
        assert!(cart.subtotal().is_zero());
        assert_eq!(cart.remove_item(pid), Err(CartError::ItemNotFound));
    }

    #[test]
    fn test_cart_rejects_foreign_currency() {
        let mut cart = Cart::new(Uuid::new_v4(), "EUR");
        assert_eq!(cart.add_item(widget(Uuid::new_v4(), 1)), Err(CartError::CurrencyMismatch));
    }
}
