//! Aggregate roots for the Booking & Pricing context.

use tourly_core::aggregate::AggregateRoot;
use tourly_core::clock::Clock;
use tourly_core::error::DomainError;
use tourly_core::event::EventMetadata;
use uuid::Uuid;

use super::events::{
    BOOKING_CONFIRMED_EVENT_TYPE, BOOKING_QUOTED_EVENT_TYPE, BookingConfirmed, BookingEvent,
    BookingEventKind, BookingQuoted,
};
use super::pricing::{self, BookingQuote};

/// Booking lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    /// Nothing recorded yet.
    Draft,
    /// Priced; awaiting customer confirmation.
    Quoted,
    /// Confirmed by the customer.
    Confirmed,
}

/// The aggregate root for a booking.
#[derive(Debug)]
pub struct Booking {
    /// Aggregate identifier.
    pub id: Uuid,
    /// Current version (event count).
    pub(crate) version: i64,
    /// Lifecycle status.
    pub(crate) status: BookingStatus,
    /// Attached quote (set after `BookingQuoted`).
    pub(crate) quote: Option<BookingQuote>,
    /// Meeting point (set after `BookingQuoted`).
    pub(crate) meeting_point: Option<String>,
    /// Uncommitted events pending persistence.
    uncommitted_events: Vec<BookingEvent>,
}

impl Booking {
    /// Creates a new, empty booking.
    #[must_use]
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            version: 0,
            status: BookingStatus::Draft,
            quote: None,
            meeting_point: None,
            uncommitted_events: Vec::new(),
        }
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub fn status(&self) -> BookingStatus {
        self.status
    }

    /// Returns the attached quote, if any.
    #[must_use]
    pub fn quote(&self) -> Option<&BookingQuote> {
        self.quote.as_ref()
    }

    /// Returns the next sequence number for a new event.
    #[allow(clippy::cast_possible_wrap)]
    fn next_sequence_number(&self) -> i64 {
        self.version + self.uncommitted_events.len() as i64 + 1
    }

    /// Prices the selection and records a `BookingQuoted` event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the booking was already quoted.
    pub fn quote_booking(
        &mut self,
        days: u32,
        start_hour: u32,
        end_hour: u32,
        meeting_point: String,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        if self.status != BookingStatus::Draft || !self.uncommitted_events.is_empty() {
            return Err(DomainError::Validation(format!(
                "booking {} has already been quoted",
                self.id
            )));
        }

        let quote = pricing::compute_price(days, start_hour, end_hour);
        let event = BookingEvent {
            metadata: EventMetadata::caused_by_command(
                BOOKING_QUOTED_EVENT_TYPE,
                self.id,
                self.next_sequence_number(),
                correlation_id,
                clock.now(),
            ),
            kind: BookingEventKind::BookingQuoted(BookingQuoted {
                booking_id: self.id,
                quote,
                meeting_point,
            }),
        };

        self.uncommitted_events.push(event);
        Ok(())
    }

    /// Records a `BookingConfirmed` event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` unless the booking is `Quoted`.
    pub fn confirm(&mut self, correlation_id: Uuid, clock: &dyn Clock) -> Result<(), DomainError> {
        match self.status {
            BookingStatus::Quoted => {}
            BookingStatus::Draft => {
                return Err(DomainError::Validation(format!(
                    "booking {} has no quote to confirm",
                    self.id
                )));
            }
            BookingStatus::Confirmed => {
                return Err(DomainError::Validation(format!(
                    "booking {} is already confirmed",
                    self.id
                )));
            }
        }

        let event = BookingEvent {
            metadata: EventMetadata::caused_by_command(
                BOOKING_CONFIRMED_EVENT_TYPE,
                self.id,
                self.next_sequence_number(),
                correlation_id,
                clock.now(),
            ),
            kind: BookingEventKind::BookingConfirmed(BookingConfirmed {
                booking_id: self.id,
            }),
        };

        self.uncommitted_events.push(event);
        Ok(())
    }
}

impl AggregateRoot for Booking {
    type Event = BookingEvent;

    fn aggregate_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn apply(&mut self, event: &Self::Event) {
        match &event.kind {
            BookingEventKind::BookingQuoted(payload) => {
                self.quote = Some(payload.quote.clone());
                self.meeting_point = Some(payload.meeting_point.clone());
                self.status = BookingStatus::Quoted;
            }
            BookingEventKind::BookingConfirmed(_) => {
                self.status = BookingStatus::Confirmed;
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
