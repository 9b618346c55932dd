//! Domain layer for the Overdue Escalation context.

pub mod commands;
pub mod events;
pub mod policy;
pub mod timer;
