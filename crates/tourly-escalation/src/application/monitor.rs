//! Timer orchestration for a single monitored order.
//!
//! An `OrderMonitor` owns one `OrderTimer` and drives it with two
//! cancellable tasks: a countdown tick and, once the order is overdue, a
//! reminder timer. The back-office alert runs on its own task so a slow
//! endpoint never delays ticks or reminders.

use std::sync::{Arc, Mutex, PoisonError};

use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tourly_core::alert::{BackOfficeAlerter, EscalationAlert};
use tourly_core::clock::Clock;
use tourly_core::error::DomainError;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::commands::{ActivateOrder, EndRequester};
use crate::domain::events::{OrderTimerEvent, OrderTimerEventKind};
use crate::domain::policy::EscalationPolicy;
use crate::domain::timer::{MonitorSnapshot, OrderTimer, ReminderOutcome, TickOutcome};

const NOTICE_CAPACITY: usize = 16;

/// Pushed to the user-facing layer on every reminder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReminderNotice {
    /// The order identifier.
    pub order_id: Uuid,
    /// 1-based reminder number.
    pub reminder_count: u32,
    /// Cumulative penalty after this reminder.
    pub accrued_penalty: Decimal,
    /// Prompt asking the user to end the order now.
    pub prompt: String,
}

struct Shared {
    order_id: Uuid,
    timer: Mutex<OrderTimer>,
    clock: Arc<dyn Clock>,
    alerter: Arc<dyn BackOfficeAlerter>,
    policy: EscalationPolicy,
    snapshots: watch::Sender<MonitorSnapshot>,
    notices: broadcast::Sender<ReminderNotice>,
    cancel: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Shared {
    /// Runs `f` against the timer, publishes the new snapshot and returns
    /// the events it recorded. The lock is never held across an await.
    fn with_timer<R>(&self, f: impl FnOnce(&mut OrderTimer) -> R) -> (R, Vec<OrderTimerEvent>) {
        let mut timer = self.timer.lock().unwrap_or_else(PoisonError::into_inner);
        let result = f(&mut timer);
        let events = timer.take_uncommitted_events();
        self.snapshots.send_replace(timer.snapshot(self.clock.now()));
        (result, events)
    }

    fn is_ended(&self) -> bool {
        self.timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_ended()
    }

    fn track(&self, handle: JoinHandle<()>) {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        tasks.retain(|task| !task.is_finished());
        tasks.push(handle);
    }

    fn dispatch(self: &Arc<Self>, events: Vec<OrderTimerEvent>) {
        for event in events {
            let sequence_number = event.metadata.sequence_number;
            match event.kind {
                OrderTimerEventKind::OrderActivated(payload) => {
                    info!(
                        order_id = %payload.order_id,
                        guide_name = %payload.guide_name,
                        scheduled_end_time = %payload.scheduled_end_time,
                        "order monitoring started"
                    );
                }
                OrderTimerEventKind::OrderBecameOverdue(payload) => {
                    warn!(
                        order_id = %payload.order_id,
                        observed_at = %payload.observed_at,
                        "order is overdue"
                    );
                    self.spawn_reminders();
                }
                OrderTimerEventKind::ReminderIssued(payload) => {
                    info!(
                        order_id = %payload.order_id,
                        reminder_count = payload.reminder_count,
                        accrued_penalty = %payload.accrued_penalty,
                        sequence_number,
                        "overdue reminder issued"
                    );
                    // No subscribers is fine; the snapshot carries the same data.
                    let _ = self.notices.send(ReminderNotice {
                        order_id: payload.order_id,
                        reminder_count: payload.reminder_count,
                        accrued_penalty: payload.accrued_penalty,
                        prompt: format!(
                            "Your service has passed its scheduled end. Reminder {} of the \
                             overdue notice; penalty so far {}. End the order now.",
                            payload.reminder_count, payload.accrued_penalty
                        ),
                    });
                }
                OrderTimerEventKind::EscalationRequested(payload) => {
                    self.spawn_escalation(payload.alert);
                }
                OrderTimerEventKind::EscalationDelivered(payload) => {
                    info!(order_id = %payload.order_id, "back office acknowledged escalation");
                }
                OrderTimerEventKind::EscalationFailed(payload) => {
                    warn!(
                        order_id = %payload.order_id,
                        reason = %payload.reason,
                        "escalation failed; not retrying"
                    );
                }
                OrderTimerEventKind::OrderEnded(payload) => {
                    info!(
                        order_id = %payload.order_id,
                        requested_by = ?payload.requested_by,
                        reminder_count = payload.reminder_count,
                        accrued_penalty = %payload.accrued_penalty,
                        "order ended"
                    );
                }
            }
        }
    }

    fn spawn_reminders(self: &Arc<Self>) {
        if self.cancel.is_cancelled() {
            return;
        }
        self.track(tokio::spawn(reminder_task(Arc::clone(self))));
    }

    fn spawn_escalation(self: &Arc<Self>, alert: EscalationAlert) {
        let shared = Arc::clone(self);
        self.track(tokio::spawn(async move {
            if shared.cancel.is_cancelled() || shared.is_ended() {
                debug!(order_id = %shared.order_id, "order ended before escalation was sent");
                return;
            }
            info!(
                order_id = %alert.order_id,
                reminder_count = alert.reminder_count,
                "escalating overdue order to back office"
            );
            let outcome = shared.alerter.send_alert(&alert).await;
            let ((), events) = shared.with_timer(|timer| {
                timer.record_escalation_outcome(outcome, shared.clock.as_ref());
            });
            shared.dispatch(events);
        }));
    }
}

async fn tick_task(shared: Arc<Shared>) {
    let mut interval = tokio::time::interval(shared.policy.tick_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = shared.cancel.cancelled() => break,
            _ = interval.tick() => {
                let (outcome, events) = shared.with_timer(|timer| {
                    timer.tick(shared.clock.as_ref(), &shared.policy)
                });
                shared.dispatch(events);
                if outcome == TickOutcome::Inactive {
                    break;
                }
            }
        }
    }
    debug!(order_id = %shared.order_id, "tick task stopped");
}

async fn reminder_task(shared: Arc<Shared>) {
    let period = shared.policy.reminder_interval;
    // Reminder #1 fires on the overdue edge, so the timer starts one period out.
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = shared.cancel.cancelled() => break,
            _ = interval.tick() => {
                let (outcome, events) = shared.with_timer(|timer| {
                    timer.issue_reminder(shared.clock.as_ref(), &shared.policy)
                });
                shared.dispatch(events);
                if !matches!(outcome, ReminderOutcome::Issued { rearm: true, .. }) {
                    break;
                }
            }
        }
    }
    debug!(order_id = %shared.order_id, "reminder task stopped");
}

/// Live overdue monitor for one active order.
pub struct OrderMonitor {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for OrderMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderMonitor")
            .field("order_id", &self.shared.order_id)
            .field("policy", &self.shared.policy)
            .finish_non_exhaustive()
    }
}

impl OrderMonitor {
    /// Activates the order and starts its countdown tick.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the activation payload is invalid.
    pub fn start(
        command: &ActivateOrder,
        clock: Arc<dyn Clock>,
        alerter: Arc<dyn BackOfficeAlerter>,
        policy: EscalationPolicy,
    ) -> Result<Self, DomainError> {
        command.validate()?;

        let mut timer = OrderTimer::new(
            command.order_id,
            command.guide_name.clone(),
            command.scheduled_end_time,
        );
        timer.activate(command.correlation_id, clock.as_ref())?;
        let activation_events = timer.take_uncommitted_events();

        let (snapshots, _) = watch::channel(timer.snapshot(clock.now()));
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);

        let shared = Arc::new(Shared {
            order_id: command.order_id,
            timer: Mutex::new(timer),
            clock,
            alerter,
            policy,
            snapshots,
            notices,
            cancel: CancellationToken::new(),
            tasks: Mutex::new(Vec::new()),
        });
        shared.dispatch(activation_events);
        shared.track(tokio::spawn(tick_task(Arc::clone(&shared))));

        Ok(Self { shared })
    }

    /// Returns the monitored order ID.
    #[must_use]
    pub fn order_id(&self) -> Uuid {
        self.shared.order_id
    }

    /// Returns a receiver that sees the snapshot after every transition
    /// and tick.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<MonitorSnapshot> {
        self.shared.snapshots.subscribe()
    }

    /// Returns a receiver for reminder notices issued from now on.
    #[must_use]
    pub fn subscribe_reminders(&self) -> broadcast::Receiver<ReminderNotice> {
        self.shared.notices.subscribe()
    }

    /// Builds a fresh snapshot as of the clock's current time.
    #[must_use]
    pub fn snapshot(&self) -> MonitorSnapshot {
        self.shared
            .timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot(self.shared.clock.now())
    }

    /// Ends the order: cancels the tick and any pending reminder, then
    /// records the end. Returns `false` if it had already ended.
    pub fn end(&self, requested_by: EndRequester) -> bool {
        self.shared.cancel.cancel();
        let (ended, events) = self
            .shared
            .with_timer(|timer| timer.end(requested_by, self.shared.clock.as_ref()));
        self.shared.dispatch(events);
        ended
    }

    /// Cancels the timers without ending the order (process shutdown).
    pub fn stop(&self) {
        self.shared.cancel.cancel();
    }

    /// Waits for every spawned task, including an in-flight alert, to finish.
    pub async fn wait_stopped(&self) {
        let handles = std::mem::take(
            &mut *self
                .shared
                .tasks
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(order_id = %self.shared.order_id, error = %e, "monitor task panicked");
            }
        }
    }
}

impl Drop for OrderMonitor {
    fn drop(&mut self) {
        self.shared.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::{DateTime, TimeZone, Utc};
    use rust_decimal_macros::dec;
    use tourly_test_support::{FailingAlerter, PausedClock, RecordingAlerter};

    use super::*;
    use crate::domain::timer::MonitorPhase;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 4, 17, 0, 0).unwrap()
    }

    fn activation(end_offset_secs: i64) -> ActivateOrder {
        ActivateOrder {
            correlation_id: Uuid::new_v4(),
            order_id: Uuid::new_v4(),
            guide_name: "Mei Lin".to_owned(),
            scheduled_end_time: t0() + chrono::Duration::seconds(end_offset_secs),
        }
    }

    fn start_monitor(end_offset_secs: i64, alerter: Arc<dyn BackOfficeAlerter>) -> OrderMonitor {
        start_monitor_with(end_offset_secs, alerter, EscalationPolicy::default())
    }

    fn start_monitor_with(
        end_offset_secs: i64,
        alerter: Arc<dyn BackOfficeAlerter>,
        policy: EscalationPolicy,
    ) -> OrderMonitor {
        let clock: Arc<dyn Clock> = Arc::new(PausedClock::starting_at(t0()));
        OrderMonitor::start(&activation(end_offset_secs), clock, alerter, policy).unwrap()
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    async fn advance_minutes(minutes: u64) {
        tokio::time::sleep(Duration::from_secs(minutes * 60)).await;
        settle().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_order_already_past_end_time_gets_first_reminder_on_first_tick() {
        // Arrange
        let monitor = start_monitor(-1, Arc::new(RecordingAlerter::new()));

        // Act
        settle().await;

        // Assert
        let snapshot = monitor.snapshot();
        assert_eq!(snapshot.phase, MonitorPhase::Overdue);
        assert_eq!(snapshot.reminder_count, 1);
        assert_eq!(snapshot.accrued_penalty, dec!(20));
        assert!(snapshot.end_order_prompt);
    }

    #[tokio::test(start_paused = true)]
    async fn test_on_time_order_counts_down_then_turns_overdue() {
        // Arrange
        let monitor = start_monitor(600, Arc::new(RecordingAlerter::new()));
        let receiver = monitor.subscribe();

        // Act
        advance_minutes(5).await;
        let halfway = receiver.borrow().clone();
        advance_minutes(6).await;

        // Assert
        assert_eq!(halfway.phase, MonitorPhase::OnTime);
        assert_eq!(halfway.time_remaining_secs, Some(300));
        assert_eq!(halfway.reminder_count, 0);

        let later = monitor.snapshot();
        assert_eq!(later.phase, MonitorPhase::Overdue);
        assert_eq!(later.reminder_count, 1);
        assert_eq!(later.time_remaining_secs, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reminders_fire_every_interval_and_escalate_once() {
        // Arrange
        let alerter = Arc::new(RecordingAlerter::new());
        let monitor = start_monitor(-1, alerter.clone());
        settle().await;

        // Act
        advance_minutes(20).await;
        let at_threshold = monitor.snapshot();
        advance_minutes(15).await;

        // Assert
        assert_eq!(at_threshold.reminder_count, 5);
        assert_eq!(at_threshold.accrued_penalty, dec!(100));
        assert_eq!(at_threshold.phase, MonitorPhase::Escalated);
        assert!(at_threshold.has_escalated);

        let later = monitor.snapshot();
        assert_eq!(later.reminder_count, 8);
        assert_eq!(later.accrued_penalty, dec!(100));

        let sent = alerter.sent_alerts();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].order_id, monitor.order_id());
        assert_eq!(sent[0].reminder_count, 5);
        assert_eq!(sent[0].guide_name, "Mei Lin");
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_escalation_is_not_retried_and_reminders_continue() {
        // Arrange
        let alerter = Arc::new(FailingAlerter::new());
        let monitor = start_monitor(-1, alerter.clone());
        settle().await;

        // Act
        advance_minutes(45).await;

        // Assert
        assert_eq!(alerter.attempts(), 1);
        let snapshot = monitor.snapshot();
        assert_eq!(snapshot.phase, MonitorPhase::Overdue);
        assert!(!snapshot.has_escalated);
        assert_eq!(snapshot.reminder_count, 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_end_cancels_pending_reminders_and_escalation() {
        // Arrange
        let alerter = Arc::new(RecordingAlerter::new());
        let monitor = start_monitor(-1, alerter.clone());
        settle().await;
        advance_minutes(7).await;
        assert_eq!(monitor.snapshot().reminder_count, 2);

        // Act
        let ended = monitor.end(EndRequester::User);
        advance_minutes(60).await;

        // Assert
        assert!(ended);
        let snapshot = monitor.snapshot();
        assert_eq!(snapshot.phase, MonitorPhase::Ended);
        assert_eq!(snapshot.reminder_count, 2);
        assert!(!snapshot.end_order_prompt);
        assert!(alerter.sent_alerts().is_empty());
        assert_eq!(monitor.subscribe().borrow().phase, MonitorPhase::Ended);
    }

    #[tokio::test(start_paused = true)]
    async fn test_end_drops_escalation_already_scheduled() {
        // Arrange
        let alerter = Arc::new(RecordingAlerter::new());
        let policy = EscalationPolicy {
            escalation_threshold: 1,
            ..EscalationPolicy::default()
        };
        let monitor = start_monitor_with(-1, alerter.clone(), policy);
        let mut receiver = monitor.subscribe();

        // The overdue edge publishes its snapshot before the alert task runs.
        while receiver.borrow_and_update().phase != MonitorPhase::Overdue {
            receiver.changed().await.unwrap();
        }

        // Act
        let ended = monitor.end(EndRequester::User);
        monitor.wait_stopped().await;
        advance_minutes(30).await;

        // Assert
        assert!(ended);
        assert!(alerter.sent_alerts().is_empty());
        let snapshot = monitor.snapshot();
        assert_eq!(snapshot.phase, MonitorPhase::Ended);
        assert_eq!(snapshot.reminder_count, 1);
        assert!(!snapshot.has_escalated);
    }

    #[tokio::test(start_paused = true)]
    async fn test_end_twice_has_no_additional_effect() {
        let monitor = start_monitor(600, Arc::new(RecordingAlerter::new()));
        settle().await;

        assert!(monitor.end(EndRequester::Operator));
        assert!(!monitor.end(EndRequester::Operator));
        assert_eq!(monitor.snapshot().phase, MonitorPhase::Ended);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reminder_notices_carry_count_penalty_and_prompt() {
        // Arrange
        let monitor = start_monitor(-1, Arc::new(RecordingAlerter::new()));
        let mut notices = monitor.subscribe_reminders();

        // Act
        settle().await;
        advance_minutes(5).await;

        // Assert
        let first = notices.recv().await.unwrap();
        let second = notices.recv().await.unwrap();
        assert_eq!(first.reminder_count, 1);
        assert_eq!(first.accrued_penalty, dec!(20));
        assert_eq!(second.reminder_count, 2);
        assert_eq!(second.accrued_penalty, dec!(40));
        assert!(second.prompt.contains("End the order now"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_timers_without_ending_order() {
        // Arrange
        let monitor = start_monitor(-1, Arc::new(RecordingAlerter::new()));
        settle().await;

        // Act
        monitor.stop();
        monitor.wait_stopped().await;
        advance_minutes(30).await;

        // Assert
        let snapshot = monitor.snapshot();
        assert_eq!(snapshot.phase, MonitorPhase::Overdue);
        assert_eq!(snapshot.reminder_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_guide_name_is_rejected() {
        let clock: Arc<dyn Clock> = Arc::new(PausedClock::starting_at(t0()));
        let mut command = activation(600);
        command.guide_name = String::new();

        let result = OrderMonitor::start(
            &command,
            clock,
            Arc::new(RecordingAlerter::new()),
            EscalationPolicy::default(),
        );

        assert!(matches!(result, Err(DomainError::Validation(_))));
    }
}
