//! Application layer for the Booking & Pricing context.

pub mod command_handlers;
pub mod query_handlers;
