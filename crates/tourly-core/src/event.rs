//! Event envelope shared by the booking and escalation contexts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Envelope fields common to every event, independent of its payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// Dotted type name, e.g. `escalation.reminder_issued`.
    pub event_type: String,
    /// Booking or order the event belongs to.
    pub aggregate_id: Uuid,
    /// 1-based, gap-free position within the aggregate's history.
    pub sequence_number: i64,
    /// Correlation ID for tracing a command through its effects.
    pub correlation_id: Uuid,
    /// Causation ID linking this event to the event/command that caused it.
    pub causation_id: Uuid,
    /// Timestamp of event creation.
    pub occurred_at: DateTime<Utc>,
}

impl EventMetadata {
    /// Metadata for an event raised directly by a command; the command's
    /// correlation ID doubles as the causation ID.
    #[must_use]
    pub fn caused_by_command(
        event_type: &str,
        aggregate_id: Uuid,
        sequence_number: i64,
        correlation_id: Uuid,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            event_type: event_type.to_owned(),
            aggregate_id,
            sequence_number,
            correlation_id,
            causation_id: correlation_id,
            occurred_at,
        }
    }
}

/// Implemented by each context's event envelope.
pub trait DomainEvent: Send + Sync + std::fmt::Debug {
    /// Returns the event type name (used for serialization routing).
    fn event_type(&self) -> &'static str;

    /// Serializes the event payload to JSON.
    fn to_payload(&self) -> serde_json::Value;

    /// Returns the metadata for this event.
    fn metadata(&self) -> &EventMetadata;
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_caused_by_command_links_causation_to_correlation() {
        // Arrange
        let order_id = Uuid::new_v4();
        let correlation_id = Uuid::new_v4();
        let at = Utc.with_ymd_and_hms(2026, 5, 4, 17, 5, 0).unwrap();

        // Act
        let meta = EventMetadata::caused_by_command(
            "escalation.reminder_issued",
            order_id,
            4,
            correlation_id,
            at,
        );

        // Assert
        assert_eq!(meta.event_type, "escalation.reminder_issued");
        assert_eq!(meta.aggregate_id, order_id);
        assert_eq!(meta.sequence_number, 4);
        assert_eq!(meta.causation_id, correlation_id);
        assert_eq!(meta.occurred_at, at);
        assert_ne!(meta.event_id, Uuid::nil());
    }
}
