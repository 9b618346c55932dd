//! Domain events for the Booking & Pricing context.

use serde::{Deserialize, Serialize};
use tourly_core::event::{DomainEvent, EventMetadata};
use uuid::Uuid;

use super::pricing::BookingQuote;

/// Emitted when a booking is priced and recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingQuoted {
    /// The booking identifier.
    pub booking_id: Uuid,
    /// The attached price breakdown.
    pub quote: BookingQuote,
    /// Confirmed meeting point label.
    pub meeting_point: String,
}

/// Emitted when the customer confirms a quoted booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingConfirmed {
    /// The booking identifier.
    pub booking_id: Uuid,
}

/// Event type identifier for [`BookingQuoted`].
pub const BOOKING_QUOTED_EVENT_TYPE: &str = "booking.quoted";

/// Event type identifier for [`BookingConfirmed`].
pub const BOOKING_CONFIRMED_EVENT_TYPE: &str = "booking.confirmed";

/// Event payload variants for the Booking & Pricing context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BookingEventKind {
    /// A booking has been quoted.
    BookingQuoted(BookingQuoted),
    /// A booking has been confirmed.
    BookingConfirmed(BookingConfirmed),
}

/// Domain event envelope for the Booking & Pricing context.
#[derive(Debug, Clone)]
pub struct BookingEvent {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub kind: BookingEventKind,
}

impl DomainEvent for BookingEvent {
    fn event_type(&self) -> &'static str {
        match &self.kind {
            BookingEventKind::BookingQuoted(_) => BOOKING_QUOTED_EVENT_TYPE,
            BookingEventKind::BookingConfirmed(_) => BOOKING_CONFIRMED_EVENT_TYPE,
        }
    }

    fn to_payload(&self) -> serde_json::Value {
        // Serialization of derived Serialize types to Value is infallible.
        serde_json::to_value(&self.kind).expect("BookingEventKind serialization is infallible")
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }
}
