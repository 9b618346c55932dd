//! Tourly Core: shared domain abstractions.
//!
//! Every bounded context (booking, escalation) depends on the traits and
//! types defined here. It contains no infrastructure code.

pub mod aggregate;
pub mod alert;
pub mod clock;
pub mod command;
pub mod error;
pub mod event;
pub mod repository;
