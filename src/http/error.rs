//! Maps checkout failures onto HTTP responses.
//!
//! Every error body is `{"error": "<message>"}`, a message safe to show the
//! shopper as-is. Storage failures are logged and replaced by a generic message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::domain::aggregates::CartError;
use crate::domain::value_objects::MoneyError;
use crate::CheckoutError;

pub const GENERIC_FAILURE: &str = "Something went wrong. Please try again.";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Please sign in to continue")]
    Unauthorized,

    #[error(transparent)]
    Checkout(#[from] CheckoutError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Checkout(err) => match err {
                CheckoutError::AddressNotFound | CheckoutError::OrderNotFound | CheckoutError::Cart(CartError::ItemNotFound) => StatusCode::NOT_FOUND,
                CheckoutError::Order(_) | CheckoutError::DuplicateReview | CheckoutError::ReviewNotAllowed => StatusCode::CONFLICT,
                CheckoutError::Pricing(MoneyError::CurrencyMismatch) | CheckoutError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
                CheckoutError::EmptyCart
                | CheckoutError::AddressRequired
                | CheckoutError::PaymentMethodRequired
                | CheckoutError::ProductNotInOrder
                | CheckoutError::Validation(_)
                | CheckoutError::Coupon(_)
                | CheckoutError::CouponCode(_)
                | CheckoutError::Quantity(_)
                | CheckoutError::Cart(_)
                | CheckoutError::Pricing(MoneyError::Overflow) => StatusCode::UNPROCESSABLE_ENTITY,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
            GENERIC_FAILURE.to_string()
        } else {
            self.to_string()
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{CouponError, OrderError, OrderStatus};
    use crate::StoreError;

    fn status(err: CheckoutError) -> StatusCode {
        AppError::from(err).into_response().status()
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::Unauthorized.into_response().status(), StatusCode::UNAUTHORIZED);
        assert_eq!(status(CheckoutError::OrderNotFound), StatusCode::NOT_FOUND);
        assert_eq!(status(CheckoutError::EmptyCart), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(status(CheckoutError::Coupon(CouponError::Expired)), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(status(CheckoutError::Order(OrderError::CannotCancel(OrderStatus::Delivered))), StatusCode::CONFLICT);
        assert_eq!(status(CheckoutError::Store(StoreError::Unavailable("down".into()))), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(status(CheckoutError::Cart(CartError::TooExpensive)), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(status(CheckoutError::Pricing(MoneyError::Overflow)), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_messages() {
        assert_eq!(AppError::from(CheckoutError::Coupon(CouponError::Expired)).to_string(), "This coupon has expired");
        assert_eq!(AppError::from(CheckoutError::PaymentMethodRequired).to_string(), "Please select a payment method");
    }
}
