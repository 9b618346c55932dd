//! Registry of live order monitors, one per active order.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tokio::sync::{broadcast, watch};
use tourly_core::alert::BackOfficeAlerter;
use tourly_core::clock::Clock;
use tourly_core::command::Command;
use tourly_core::error::DomainError;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::monitor::{OrderMonitor, ReminderNotice};
use crate::domain::commands::{ActivateOrder, EndOrder};
use crate::domain::policy::EscalationPolicy;
use crate::domain::timer::MonitorSnapshot;

/// Result of an end request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum EndOutcome {
    /// The order was being monitored and is now ended.
    Ended {
        /// Final state of the order.
        snapshot: MonitorSnapshot,
    },
    /// No monitor was active for the order.
    NotActive,
}

/// Owns every live `OrderMonitor`.
pub struct MonitorRegistry {
    monitors: Mutex<HashMap<Uuid, OrderMonitor>>,
    clock: Arc<dyn Clock>,
    alerter: Arc<dyn BackOfficeAlerter>,
    policy: EscalationPolicy,
}

impl std::fmt::Debug for MonitorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitorRegistry")
            .field("active_orders", &self.active_orders().len())
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl MonitorRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        alerter: Arc<dyn BackOfficeAlerter>,
        policy: EscalationPolicy,
    ) -> Self {
        Self {
            monitors: Mutex::new(HashMap::new()),
            clock,
            alerter,
            policy,
        }
    }

    /// The policy applied to new monitors.
    #[must_use]
    pub fn policy(&self) -> &EscalationPolicy {
        &self.policy
    }

    /// Starts monitoring an order.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::OrderAlreadyActive` if the order is already
    /// monitored, or `DomainError::Validation` for an invalid payload.
    #[instrument(
        skip(self, command),
        fields(
            command_type = command.command_type(),
            order_id = %command.order_id,
            correlation_id = %command.correlation_id
        )
    )]
    pub fn activate(&self, command: &ActivateOrder) -> Result<MonitorSnapshot, DomainError> {
        let mut monitors = self.lock();
        if monitors.contains_key(&command.order_id) {
            return Err(DomainError::OrderAlreadyActive(command.order_id));
        }

        let monitor = OrderMonitor::start(
            command,
            Arc::clone(&self.clock),
            Arc::clone(&self.alerter),
            self.policy.clone(),
        )?;
        let snapshot = monitor.snapshot();
        monitors.insert(command.order_id, monitor);
        Ok(snapshot)
    }

    /// Ends an order and stops its monitor. Ending an order that is not
    /// monitored is a no-op.
    #[instrument(
        skip(self, command),
        fields(
            command_type = command.command_type(),
            order_id = %command.order_id,
            correlation_id = %command.correlation_id
        )
    )]
    pub fn end(&self, command: &EndOrder) -> EndOutcome {
        let removed = self.lock().remove(&command.order_id);
        match removed {
            Some(monitor) => {
                monitor.end(command.requested_by);
                EndOutcome::Ended {
                    snapshot: monitor.snapshot(),
                }
            }
            None => {
                debug!("end requested for an order that is not monitored");
                EndOutcome::NotActive
            }
        }
    }

    /// Current snapshot of a monitored order.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::AggregateNotFound` if the order is not monitored.
    pub fn snapshot(&self, order_id: Uuid) -> Result<MonitorSnapshot, DomainError> {
        self.lock()
            .get(&order_id)
            .map(OrderMonitor::snapshot)
            .ok_or(DomainError::AggregateNotFound(order_id))
    }

    /// Subscribes to snapshot updates for a monitored order.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::AggregateNotFound` if the order is not monitored.
    pub fn subscribe(
        &self,
        order_id: Uuid,
    ) -> Result<watch::Receiver<MonitorSnapshot>, DomainError> {
        self.lock()
            .get(&order_id)
            .map(OrderMonitor::subscribe)
            .ok_or(DomainError::AggregateNotFound(order_id))
    }

    /// Subscribes to reminder notices for a monitored order.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::AggregateNotFound` if the order is not monitored.
    pub fn subscribe_reminders(
        &self,
        order_id: Uuid,
    ) -> Result<broadcast::Receiver<ReminderNotice>, DomainError> {
        self.lock()
            .get(&order_id)
            .map(OrderMonitor::subscribe_reminders)
            .ok_or(DomainError::AggregateNotFound(order_id))
    }

    /// IDs of every monitored order.
    #[must_use]
    pub fn active_orders(&self) -> Vec<Uuid> {
        self.lock().keys().copied().collect()
    }

    /// Stops every monitor and waits for its tasks. Orders are not marked
    /// ended; their timers simply stop.
    pub async fn shutdown(&self) {
        let drained: Vec<OrderMonitor> = self.lock().drain().map(|(_, monitor)| monitor).collect();
        info!(monitors = drained.len(), "stopping order monitors");
        for monitor in &drained {
            monitor.stop();
        }
        for monitor in &drained {
            monitor.wait_stopped().await;
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, OrderMonitor>> {
        self.monitors.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::{DateTime, TimeZone, Utc};
    use rust_decimal_macros::dec;
    use tourly_test_support::{PausedClock, RecordingAlerter};

    use super::*;
    use crate::domain::commands::EndRequester;
    use crate::domain::timer::MonitorPhase;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 4, 17, 0, 0).unwrap()
    }

    fn registry(alerter: Arc<RecordingAlerter>) -> MonitorRegistry {
        MonitorRegistry::new(
            Arc::new(PausedClock::starting_at(t0())),
            alerter,
            EscalationPolicy::default(),
        )
    }

    fn activation(order_id: Uuid, end_offset_secs: i64) -> ActivateOrder {
        ActivateOrder {
            correlation_id: Uuid::new_v4(),
            order_id,
            guide_name: "Tomás Ruiz".to_owned(),
            scheduled_end_time: t0() + chrono::Duration::seconds(end_offset_secs),
        }
    }

    fn end_order(order_id: Uuid) -> EndOrder {
        EndOrder {
            correlation_id: Uuid::new_v4(),
            order_id,
            requested_by: EndRequester::User,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_activate_returns_on_time_snapshot() {
        // Arrange
        let registry = registry(Arc::new(RecordingAlerter::new()));
        let order_id = Uuid::new_v4();

        // Act
        let snapshot = registry.activate(&activation(order_id, 3_600)).unwrap();

        // Assert
        assert_eq!(snapshot.order_id, order_id);
        assert_eq!(snapshot.phase, MonitorPhase::OnTime);
        assert_eq!(snapshot.time_remaining_secs, Some(3_600));
        assert_eq!(registry.active_orders(), vec![order_id]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_activation_of_same_order_is_rejected() {
        // Arrange
        let registry = registry(Arc::new(RecordingAlerter::new()));
        let order_id = Uuid::new_v4();
        registry.activate(&activation(order_id, 600)).unwrap();

        // Act
        let result = registry.activate(&activation(order_id, 900));

        // Assert
        assert!(matches!(result, Err(DomainError::OrderAlreadyActive(id)) if id == order_id));
        assert_eq!(registry.active_orders().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_end_removes_monitor_and_second_end_is_noop() {
        // Arrange
        let registry = registry(Arc::new(RecordingAlerter::new()));
        let order_id = Uuid::new_v4();
        registry.activate(&activation(order_id, -1)).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        // Act
        let first = registry.end(&end_order(order_id));
        let second = registry.end(&end_order(order_id));

        // Assert
        match first {
            EndOutcome::Ended { snapshot } => {
                assert_eq!(snapshot.phase, MonitorPhase::Ended);
                assert_eq!(snapshot.reminder_count, 1);
                assert_eq!(snapshot.accrued_penalty, dec!(20));
            }
            EndOutcome::NotActive => panic!("expected Ended"),
        }
        assert_eq!(second, EndOutcome::NotActive);
        assert!(matches!(
            registry.snapshot(order_id),
            Err(DomainError::AggregateNotFound(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_end_unknown_order_is_not_active() {
        let registry = registry(Arc::new(RecordingAlerter::new()));

        assert_eq!(registry.end(&end_order(Uuid::new_v4())), EndOutcome::NotActive);
    }

    #[tokio::test(start_paused = true)]
    async fn test_orders_are_monitored_independently() {
        // Arrange
        let alerter = Arc::new(RecordingAlerter::new());
        let registry = registry(alerter.clone());
        let late = Uuid::new_v4();
        let early = Uuid::new_v4();
        registry.activate(&activation(late, -1)).unwrap();
        registry.activate(&activation(early, 7_200)).unwrap();

        // Act
        tokio::time::sleep(Duration::from_secs(20 * 60 + 1)).await;

        // Assert
        let late_snapshot = registry.snapshot(late).unwrap();
        let early_snapshot = registry.snapshot(early).unwrap();
        assert_eq!(late_snapshot.reminder_count, 5);
        assert_eq!(late_snapshot.phase, MonitorPhase::Escalated);
        assert_eq!(early_snapshot.reminder_count, 0);
        assert_eq!(early_snapshot.phase, MonitorPhase::OnTime);
        assert_eq!(alerter.sent_alerts().len(), 1);
        assert_eq!(alerter.sent_alerts()[0].order_id, late);
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribe_to_unknown_order_fails() {
        let registry = registry(Arc::new(RecordingAlerter::new()));

        assert!(registry.subscribe(Uuid::new_v4()).is_err());
        assert!(registry.subscribe_reminders(Uuid::new_v4()).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_every_monitor() {
        // Arrange
        let registry = registry(Arc::new(RecordingAlerter::new()));
        let order_id = Uuid::new_v4();
        registry.activate(&activation(order_id, -1)).unwrap();
        let mut updates = registry.subscribe(order_id).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        // Act
        registry.shutdown().await;

        // Assert
        assert!(registry.active_orders().is_empty());
        tokio::time::sleep(Duration::from_secs(3_600)).await;
        assert_eq!(updates.borrow_and_update().reminder_count, 1);
        assert!(!updates.has_changed().unwrap_or(false));
    }
}
