//! Event stream storage port.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::error::DomainError;
use crate::event::{DomainEvent, EventMetadata};

/// An event as it sits in a stream: metadata columns plus a JSON payload.
#[derive(Debug, Clone)]
pub struct StoredEvent {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// Stream the event belongs to.
    pub aggregate_id: Uuid,
    /// Dotted type name, e.g. `booking.quoted`.
    pub event_type: String,
    /// Serialized event kind.
    pub payload: serde_json::Value,
    /// 1-based position within the stream.
    pub sequence_number: i64,
    /// Correlation ID of the originating command.
    pub correlation_id: Uuid,
    /// What caused the event.
    pub causation_id: Uuid,
    /// When the event was recorded.
    pub occurred_at: DateTime<Utc>,
}

impl StoredEvent {
    /// Captures a domain event for appending.
    pub fn from_domain_event<E: DomainEvent>(event: &E) -> Self {
        let meta = event.metadata();
        Self {
            event_id: meta.event_id,
            aggregate_id: meta.aggregate_id,
            event_type: event.event_type().to_owned(),
            payload: event.to_payload(),
            sequence_number: meta.sequence_number,
            correlation_id: meta.correlation_id,
            causation_id: meta.causation_id,
            occurred_at: meta.occurred_at,
        }
    }

    /// Rebuilds the event metadata for replay.
    #[must_use]
    pub fn metadata(&self) -> EventMetadata {
        EventMetadata {
            event_id: self.event_id,
            event_type: self.event_type.clone(),
            aggregate_id: self.aggregate_id,
            sequence_number: self.sequence_number,
            correlation_id: self.correlation_id,
            causation_id: self.causation_id,
            occurred_at: self.occurred_at,
        }
    }

    /// Deserializes the payload into an event kind.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the payload does not match `T`.
    pub fn decode_payload<T: DeserializeOwned>(&self) -> Result<T, DomainError> {
        serde_json::from_value(self.payload.clone()).map_err(|e| {
            DomainError::Infrastructure(format!(
                "cannot decode {} event {}: {e}",
                self.event_type, self.event_id
            ))
        })
    }
}

/// Loads and appends per-aggregate event streams.
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Loads a stream in sequence order. An unknown aggregate yields an
    /// empty stream, not an error.
    async fn load_events(&self, aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError>;

    /// Appends to a stream if its last sequence number equals
    /// `expected_version` (0 for a new stream).
    ///
    /// # Errors
    ///
    /// Implementations return `DomainError::ConcurrencyConflict` when the
    /// stream has moved on.
    async fn append_events(
        &self,
        aggregate_id: Uuid,
        expected_version: i64,
        events: &[StoredEvent],
    ) -> Result<(), DomainError>;
}
