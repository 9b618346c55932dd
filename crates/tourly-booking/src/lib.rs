//! Tourly Booking & Pricing bounded context.
//!
//! Responsible for turning a day count and a daily time window into a
//! price quote, and for recording bookings with their quote attached.

pub mod application;
pub mod domain;
