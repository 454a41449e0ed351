//! Shipping addresses

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ShippingAddress {
    pub id: Uuid,
    pub user_id: Uuid,
    pub full_name: String,
    pub phone: String,
    pub address_line1: String,
    pub address_line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

/// Address form submitted from checkout.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct NewAddress {
    #[validate(length(min = 1, max = 100, message = "Full name is required"))]
    pub full_name: String,
    #[validate(custom = "validate_phone")]
    pub phone: String,
    #[validate(length(min = 1, max = 200, message = "Address line 1 is required"))]
    pub address_line1: String,
    #[validate(length(max = 200, message = "Address line 2 is too long"))]
    pub address_line2: Option<String>,
    #[validate(length(min = 1, max = 100, message = "City is required"))]
    pub city: String,
    #[validate(length(min = 1, max = 100, message = "State is required"))]
    pub state: String,
    #[validate(custom = "validate_postal_code")]
    pub postal_code: String,
    #[validate(length(min = 2, max = 56, message = "Country is required"))]
    pub country: String,
    #[serde(default)]
    pub is_default: bool,
}

impl NewAddress {
    /// Trims every text field and drops an empty second line.
    pub fn normalized(mut self) -> Self {
        for field in [&mut self.full_name, &mut self.phone, &mut self.address_line1, &mut self.city, &mut self.state, &mut self.postal_code, &mut self.country] {
            *field = field.trim().to_string();
        }
        self.address_line2 = self.address_line2.map(|l| l.trim().to_string()).filter(|l| !l.is_empty());
        self
    }

    pub fn into_address(self, user_id: Uuid, is_default: bool) -> ShippingAddress {
        ShippingAddress {
            id: Uuid::now_v7(), user_id, full_name: self.full_name, phone: self.phone,
            address_line1: self.address_line1, address_line2: self.address_line2, city: self.city,
            state: self.state, postal_code: self.postal_code, country: self.country, is_default,
            created_at: Utc::now(),
        }
    }
}

/// Orders addresses the way the picker shows them: default first, then newest.
pub fn sort_for_display(addresses: &mut [ShippingAddress]) {
    addresses.sort_by(|a, b| b.is_default.cmp(&a.is_default).then(b.created_at.cmp(&a.created_at)));
}

fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    let rest = phone.strip_prefix('+').unwrap_or(phone);
    let mut digits = 0;
    for c in rest.chars() {
        match c {
            '0'..='9' => digits += 1,
            ' ' | '-' => {}
            _ => return Err(invalid("phone", "Phone number may only contain digits")),
        }
    }
    if !(7..=15).contains(&digits) {
        return Err(invalid("phone", "Phone number must have 7 to 15 digits"));
    }
    Ok(())
}

fn validate_postal_code(code: &str) -> Result<(), ValidationError> {
    if !(3..=10).contains(&code.len()) {
        return Err(invalid("postal_code", "Postal code must be 3 to 10 characters"));
    }
    if !code.chars().all(|c| c.is_ascii_alphanumeric() || c == ' ' || c == '-') {
        return Err(invalid("postal_code", "Postal code contains invalid characters"));
    }
    Ok(())
}

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}
