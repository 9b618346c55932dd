//! Escalation timing and penalty settings.

use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Timing and penalty rules applied to every monitored order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscalationPolicy {
    /// Countdown tick period.
    pub tick_interval: Duration,
    /// Period between overdue reminders.
    pub reminder_interval: Duration,
    /// Penalty added by each reminder.
    pub penalty_per_reminder: Decimal,
    /// Ceiling on the cumulative penalty.
    pub penalty_cap: Decimal,
    /// Reminder count at which the back office is alerted.
    pub escalation_threshold: u32,
    /// Stop re-arming reminders after this many; `None` keeps reminding.
    pub max_reminders: Option<u32>,
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            reminder_interval: Duration::from_secs(5 * 60),
            penalty_per_reminder: dec!(20),
            penalty_cap: dec!(100),
            escalation_threshold: 5,
            max_reminders: None,
        }
    }
}

impl EscalationPolicy {
    /// Returns the penalty after one more reminder, capped.
    #[must_use]
    pub fn accrue(&self, current: Decimal) -> Decimal {
        (current + self.penalty_per_reminder).min(self.penalty_cap)
    }

    /// Whether another reminder may be issued after `reminder_count`.
    #[must_use]
    pub fn allows_reminder_after(&self, reminder_count: u32) -> bool {
        self.max_reminders.is_none_or(|max| reminder_count < max)
    }
}
