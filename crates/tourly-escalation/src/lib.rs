//! Tourly Overdue Escalation bounded context.
//!
//! Watches active orders past their scheduled end time, issues graduated
//! reminders with an accruing penalty, and raises a single back-office
//! alert once the reminder threshold is reached.

pub mod alerting;
pub mod application;
pub mod domain;
