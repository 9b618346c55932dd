//! Domain events for the Overdue Escalation context.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tourly_core::alert::EscalationAlert;
use tourly_core::event::{DomainEvent, EventMetadata};
use uuid::Uuid;

use super::commands::EndRequester;

/// Emitted when monitoring of an active order starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderActivated {
    /// The order identifier.
    pub order_id: Uuid,
    /// Guide assigned to the order.
    pub guide_name: String,
    /// When the service is scheduled to end.
    pub scheduled_end_time: DateTime<Utc>,
}

/// Emitted on the first tick at or past the scheduled end time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderBecameOverdue {
    /// The order identifier.
    pub order_id: Uuid,
    /// Time of the tick that observed the overdue state.
    pub observed_at: DateTime<Utc>,
}

/// Emitted for every overdue reminder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderIssued {
    /// The order identifier.
    pub order_id: Uuid,
    /// 1-based reminder number.
    pub reminder_count: u32,
    /// Cumulative penalty after this reminder.
    pub accrued_penalty: Decimal,
}

/// Emitted when the reminder threshold triggers the back-office alert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationRequested {
    /// The alert to deliver.
    pub alert: EscalationAlert,
}

/// Emitted when the back office acknowledged the alert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationDelivered {
    /// The order identifier.
    pub order_id: Uuid,
}

/// Emitted when alert delivery failed. It is not retried.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationFailed {
    /// The order identifier.
    pub order_id: Uuid,
    /// Failure description.
    pub reason: String,
}

/// Emitted when the order is manually ended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderEnded {
    /// The order identifier.
    pub order_id: Uuid,
    /// Origin of the end request.
    pub requested_by: EndRequester,
    /// Reminders issued before the end.
    pub reminder_count: u32,
    /// Penalty accrued before the end.
    pub accrued_penalty: Decimal,
}

/// Event type identifier for [`OrderActivated`].
pub const ORDER_ACTIVATED_EVENT_TYPE: &str = "escalation.order_activated";

/// Event type identifier for [`OrderBecameOverdue`].
pub const ORDER_BECAME_OVERDUE_EVENT_TYPE: &str = "escalation.order_became_overdue";

/// Event type identifier for [`ReminderIssued`].
pub const REMINDER_ISSUED_EVENT_TYPE: &str = "escalation.reminder_issued";

/// Event type identifier for [`EscalationRequested`].
pub const ESCALATION_REQUESTED_EVENT_TYPE: &str = "escalation.escalation_requested";

/// Event type identifier for [`EscalationDelivered`].
pub const ESCALATION_DELIVERED_EVENT_TYPE: &str = "escalation.escalation_delivered";

/// Event type identifier for [`EscalationFailed`].
pub const ESCALATION_FAILED_EVENT_TYPE: &str = "escalation.escalation_failed";

/// Event type identifier for [`OrderEnded`].
pub const ORDER_ENDED_EVENT_TYPE: &str = "escalation.order_ended";

/// Event payload variants for the Overdue Escalation context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OrderTimerEventKind {
    /// Monitoring started.
    OrderActivated(OrderActivated),
    /// The scheduled end time passed.
    OrderBecameOverdue(OrderBecameOverdue),
    /// An overdue reminder fired.
    ReminderIssued(ReminderIssued),
    /// The back-office alert should be sent.
    EscalationRequested(EscalationRequested),
    /// The back office acknowledged the alert.
    EscalationDelivered(EscalationDelivered),
    /// The back-office alert failed.
    EscalationFailed(EscalationFailed),
    /// The order was ended.
    OrderEnded(OrderEnded),
}

impl OrderTimerEventKind {
    /// Returns the dotted event type name.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::OrderActivated(_) => ORDER_ACTIVATED_EVENT_TYPE,
            Self::OrderBecameOverdue(_) => ORDER_BECAME_OVERDUE_EVENT_TYPE,
            Self::ReminderIssued(_) => REMINDER_ISSUED_EVENT_TYPE,
            Self::EscalationRequested(_) => ESCALATION_REQUESTED_EVENT_TYPE,
            Self::EscalationDelivered(_) => ESCALATION_DELIVERED_EVENT_TYPE,
            Self::EscalationFailed(_) => ESCALATION_FAILED_EVENT_TYPE,
            Self::OrderEnded(_) => ORDER_ENDED_EVENT_TYPE,
        }
    }
}

/// Domain event envelope for the Overdue Escalation context.
#[derive(Debug, Clone)]
pub struct OrderTimerEvent {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub kind: OrderTimerEventKind,
}

impl DomainEvent for OrderTimerEvent {
    fn event_type(&self) -> &'static str {
        self.kind.event_type()
    }

    fn to_payload(&self) -> serde_json::Value {
        // Serialization of derived Serialize types to Value is infallible.
        serde_json::to_value(&self.kind).expect("OrderTimerEventKind serialization is infallible")
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }
}
