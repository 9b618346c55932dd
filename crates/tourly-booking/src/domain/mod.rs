//! Domain layer for the Booking & Pricing context.

pub mod aggregates;
pub mod commands;
pub mod events;
pub mod pricing;
