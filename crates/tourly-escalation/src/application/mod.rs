//! Application layer for the Overdue Escalation context.

pub mod monitor;
pub mod registry;
