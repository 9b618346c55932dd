//! The per-order overdue state machine.
//!
//! `OrderTimer` holds every transition rule of the escalation lifecycle:
//!
//! ```text
//! Idle -> OnTime -> Overdue -> Escalated
//!   \________\_________\__________\______-> Ended
//! ```
//!
//! It never reads the system clock or touches a timer itself. The monitor
//! calls [`OrderTimer::tick`] every second and [`OrderTimer::issue_reminder`]
//! every reminder interval, passing a `Clock`; the timer records events and
//! the monitor dispatches their side effects.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tourly_core::aggregate::AggregateRoot;
use tourly_core::alert::{AlertError, EscalationAlert};
use tourly_core::clock::Clock;
use tourly_core::error::DomainError;
use tourly_core::event::EventMetadata;
use uuid::Uuid;

use super::commands::EndRequester;
use super::events::{
    EscalationDelivered, EscalationFailed, EscalationRequested, OrderActivated,
    OrderBecameOverdue, OrderEnded, OrderTimerEvent, OrderTimerEventKind, ReminderIssued,
};
use super::policy::EscalationPolicy;

/// Lifecycle phase of a monitored order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorPhase {
    /// Not yet active.
    Idle,
    /// Active, scheduled end time not reached.
    OnTime,
    /// Past the scheduled end time; reminders firing.
    Overdue,
    /// Overdue and the back office acknowledged the alert.
    Escalated,
    /// Manually ended. Terminal.
    Ended,
}

/// Result of a countdown tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The order is idle or ended; nothing happened.
    Inactive,
    /// Still on time.
    OnTime {
        /// Time left until the scheduled end.
        remaining: chrono::Duration,
    },
    /// This tick crossed the scheduled end time and issued reminder #1.
    BecameOverdue,
    /// Already overdue; reminders are driven by the reminder timer.
    Overdue,
}

/// Result of a reminder fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderOutcome {
    /// Not overdue or already ended; nothing happened.
    Skipped,
    /// The reminder limit had been reached; nothing happened.
    LimitReached,
    /// A reminder was issued.
    Issued {
        /// The new reminder count.
        reminder_count: u32,
        /// Whether the reminder timer should fire again.
        rearm: bool,
    },
}

/// Read-only projection handed to display code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonitorSnapshot {
    /// The order identifier.
    pub order_id: Uuid,
    /// Guide assigned to the order.
    pub guide_name: String,
    /// Current phase.
    pub phase: MonitorPhase,
    /// When the service is scheduled to end.
    pub scheduled_end_time: DateTime<Utc>,
    /// Whole seconds left while on time; `None` once overdue or ended.
    pub time_remaining_secs: Option<i64>,
    /// Whether the scheduled end time has been observed as passed.
    pub is_overdue: bool,
    /// Reminders issued so far.
    pub reminder_count: u32,
    /// Penalty accrued so far.
    pub accrued_penalty: Decimal,
    /// Whether the back office acknowledged the escalation alert.
    pub has_escalated: bool,
    /// Whether the user should be prompted to end the order now.
    pub end_order_prompt: bool,
}

/// The aggregate root for one active order's overdue tracking.
#[derive(Debug)]
pub struct OrderTimer {
    /// Aggregate identifier (the order ID).
    pub id: Uuid,
    /// Current version (event count).
    pub(crate) version: i64,
    guide_name: String,
    scheduled_end_time: DateTime<Utc>,
    /// Correlation ID of the activation; carried by every later event.
    correlation_id: Uuid,
    phase: MonitorPhase,
    reminder_count: u32,
    accrued_penalty: Decimal,
    is_overdue: bool,
    /// At-most-once guard: set when the alert is requested, success or not.
    escalation_attempted: bool,
    has_escalated_to_backend: bool,
    uncommitted_events: Vec<OrderTimerEvent>,
}

impl OrderTimer {
    /// Creates an idle timer for an order.
    #[must_use]
    pub fn new(order_id: Uuid, guide_name: String, scheduled_end_time: DateTime<Utc>) -> Self {
        Self {
            id: order_id,
            version: 0,
            guide_name,
            scheduled_end_time,
            correlation_id: Uuid::nil(),
            phase: MonitorPhase::Idle,
            reminder_count: 0,
            accrued_penalty: Decimal::ZERO,
            is_overdue: false,
            escalation_attempted: false,
            has_escalated_to_backend: false,
            uncommitted_events: Vec::new(),
        }
    }

    /// Returns the current phase.
    #[must_use]
    pub fn phase(&self) -> MonitorPhase {
        self.phase
    }

    /// Returns the number of reminders issued.
    #[must_use]
    pub fn reminder_count(&self) -> u32 {
        self.reminder_count
    }

    /// Returns the cumulative penalty.
    #[must_use]
    pub fn accrued_penalty(&self) -> Decimal {
        self.accrued_penalty
    }

    /// Whether the back office acknowledged the alert.
    #[must_use]
    pub fn has_escalated_to_backend(&self) -> bool {
        self.has_escalated_to_backend
    }

    /// Whether the order has been ended.
    #[must_use]
    pub fn is_ended(&self) -> bool {
        self.phase == MonitorPhase::Ended
    }

    /// Starts monitoring, producing an `OrderActivated` event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` unless the timer is `Idle`.
    pub fn activate(
        &mut self,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        if self.phase != MonitorPhase::Idle {
            return Err(DomainError::Validation(format!(
                "order {} cannot be activated from {:?}",
                self.id, self.phase
            )));
        }

        self.correlation_id = correlation_id;
        self.record(
            OrderTimerEventKind::OrderActivated(OrderActivated {
                order_id: self.id,
                guide_name: self.guide_name.clone(),
                scheduled_end_time: self.scheduled_end_time,
            }),
            clock.now(),
        );
        Ok(())
    }

    /// Countdown tick. Detects the on-time to overdue edge; on that edge the
    /// first reminder is issued immediately.
    pub fn tick(&mut self, clock: &dyn Clock, policy: &EscalationPolicy) -> TickOutcome {
        let now = clock.now();
        match self.phase {
            MonitorPhase::Idle | MonitorPhase::Ended => TickOutcome::Inactive,
            MonitorPhase::Overdue | MonitorPhase::Escalated => TickOutcome::Overdue,
            MonitorPhase::OnTime if now < self.scheduled_end_time => TickOutcome::OnTime {
                remaining: self.scheduled_end_time - now,
            },
            MonitorPhase::OnTime => {
                self.record(
                    OrderTimerEventKind::OrderBecameOverdue(OrderBecameOverdue {
                        order_id: self.id,
                        observed_at: now,
                    }),
                    now,
                );
                self.issue_reminder_at(now, policy);
                TickOutcome::BecameOverdue
            }
        }
    }

    /// Reminder timer fire. Increments the count, accrues the capped
    /// penalty and requests the back-office alert on the threshold.
    pub fn issue_reminder(
        &mut self,
        clock: &dyn Clock,
        policy: &EscalationPolicy,
    ) -> ReminderOutcome {
        self.issue_reminder_at(clock.now(), policy)
    }

    fn issue_reminder_at(
        &mut self,
        now: DateTime<Utc>,
        policy: &EscalationPolicy,
    ) -> ReminderOutcome {
        if !matches!(self.phase, MonitorPhase::Overdue | MonitorPhase::Escalated) {
            return ReminderOutcome::Skipped;
        }
        if !policy.allows_reminder_after(self.reminder_count) {
            return ReminderOutcome::LimitReached;
        }

        let reminder_count = self.reminder_count + 1;
        self.record(
            OrderTimerEventKind::ReminderIssued(ReminderIssued {
                order_id: self.id,
                reminder_count,
                accrued_penalty: policy.accrue(self.accrued_penalty),
            }),
            now,
        );

        if reminder_count >= policy.escalation_threshold && !self.escalation_attempted {
            let alert = EscalationAlert {
                order_id: self.id,
                guide_name: self.guide_name.clone(),
                reminder_count,
                accrued_penalty: self.accrued_penalty,
                scheduled_end_time: self.scheduled_end_time,
                alert_timestamp: now,
            };
            self.record(
                OrderTimerEventKind::EscalationRequested(EscalationRequested { alert }),
                now,
            );
        }

        ReminderOutcome::Issued {
            reminder_count,
            rearm: policy.allows_reminder_after(reminder_count),
        }
    }

    /// Records the outcome of the alert call. A success sets the
    /// escalation flag; a failure is recorded and never retried.
    /// Outcomes for an alert that was never requested, or arriving after
    /// a success, are ignored. An outcome landing after the order ended is
    /// recorded without leaving `Ended`.
    pub fn record_escalation_outcome(
        &mut self,
        outcome: Result<(), AlertError>,
        clock: &dyn Clock,
    ) {
        if !self.escalation_attempted || self.has_escalated_to_backend {
            return;
        }

        let kind = match outcome {
            Ok(()) => OrderTimerEventKind::EscalationDelivered(EscalationDelivered {
                order_id: self.id,
            }),
            Err(error) => OrderTimerEventKind::EscalationFailed(EscalationFailed {
                order_id: self.id,
                reason: error.to_string(),
            }),
        };
        self.record(kind, clock.now());
    }

    /// Ends the order. Returns `false` if it had already ended.
    pub fn end(&mut self, requested_by: EndRequester, clock: &dyn Clock) -> bool {
        if self.phase == MonitorPhase::Ended {
            return false;
        }

        self.record(
            OrderTimerEventKind::OrderEnded(OrderEnded {
                order_id: self.id,
                requested_by,
                reminder_count: self.reminder_count,
                accrued_penalty: self.accrued_penalty,
            }),
            clock.now(),
        );
        true
    }

    /// Builds the display projection as of `now`.
    #[must_use]
    pub fn snapshot(&self, now: DateTime<Utc>) -> MonitorSnapshot {
        let counting_down = matches!(self.phase, MonitorPhase::Idle | MonitorPhase::OnTime);
        let time_remaining_secs =
            counting_down.then(|| (self.scheduled_end_time - now).num_seconds().max(0));

        MonitorSnapshot {
            order_id: self.id,
            guide_name: self.guide_name.clone(),
            phase: self.phase,
            scheduled_end_time: self.scheduled_end_time,
            time_remaining_secs,
            is_overdue: self.is_overdue,
            reminder_count: self.reminder_count,
            accrued_penalty: self.accrued_penalty,
            has_escalated: self.has_escalated_to_backend,
            end_order_prompt: self.is_overdue && self.phase != MonitorPhase::Ended,
        }
    }

    /// Removes and returns the events recorded since the last drain.
    pub fn take_uncommitted_events(&mut self) -> Vec<OrderTimerEvent> {
        std::mem::take(&mut self.uncommitted_events)
    }

    /// Applies and records an event. Transitions take effect immediately so
    /// that later checks in the same callback see them.
    fn record(&mut self, kind: OrderTimerEventKind, now: DateTime<Utc>) {
        let event = OrderTimerEvent {
            metadata: EventMetadata::caused_by_command(
                kind.event_type(),
                self.id,
                self.version + 1,
                self.correlation_id,
                now,
            ),
            kind,
        };
        self.apply(&event);
        self.uncommitted_events.push(event);
    }
}

impl AggregateRoot for OrderTimer {
    type Event = OrderTimerEvent;

    fn aggregate_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn apply(&mut self, event: &Self::Event) {
        match &event.kind {
            OrderTimerEventKind::OrderActivated(payload) => {
                self.guide_name.clone_from(&payload.guide_name);
                self.scheduled_end_time = payload.scheduled_end_time;
                self.phase = MonitorPhase::OnTime;
            }
            OrderTimerEventKind::OrderBecameOverdue(_) => {
                self.is_overdue = true;
                self.phase = MonitorPhase::Overdue;
            }
            OrderTimerEventKind::ReminderIssued(payload) => {
                self.reminder_count = payload.reminder_count;
                self.accrued_penalty = payload.accrued_penalty;
            }
            OrderTimerEventKind::EscalationRequested(_) => {
                self.escalation_attempted = true;
            }
            OrderTimerEventKind::EscalationDelivered(_) => {
                self.has_escalated_to_backend = true;
                if self.phase == MonitorPhase::Overdue {
                    self.phase = MonitorPhase::Escalated;
                }
            }
            OrderTimerEventKind::EscalationFailed(_) => {}
            OrderTimerEventKind::OrderEnded(_) => {
                self.phase = MonitorPhase::Ended;
            }
        }
        self.version += 1;
    }

    fn uncommitted_events(&self) -> &[Self::Event] {
        &self.uncommitted_events
    }

    fn clear_uncommitted_events(&mut self) {
        self.uncommitted_events.clear();
    }
}
