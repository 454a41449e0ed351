//! Checkout domain model
pub mod aggregates;
pub mod events;
pub mod pricing;
pub mod value_objects;
