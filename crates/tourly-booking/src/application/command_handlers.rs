//! Command handlers for the Booking & Pricing context.
//!
//! Each handler loads the aggregate, executes the command and persists the
//! resulting events.

use tourly_core::aggregate::AggregateRoot;
use tourly_core::clock::Clock;
use tourly_core::command::Command;
use tourly_core::error::DomainError;
use tourly_core::repository::{EventRepository, StoredEvent};
use tracing::info;
use uuid::Uuid;

use crate::domain::aggregates::Booking;
use crate::domain::commands::{ConfirmBooking, QuoteBooking};
use crate::domain::events::{BookingEvent, BookingEventKind};

/// Result of a successfully handled command.
#[derive(Debug)]
pub struct BookingCommandResult {
    /// The aggregate ID affected or created by the command.
    pub aggregate_id: Uuid,
    /// The stored events produced and persisted.
    pub stored_events: Vec<StoredEvent>,
}

/// Reconstitutes a `Booking` from stored events.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if event deserialization fails.
pub(crate) fn reconstitute(
    booking_id: Uuid,
    existing_events: &[StoredEvent],
) -> Result<Booking, DomainError> {
    let mut booking = Booking::new(booking_id);
    for stored in existing_events {
        let event = BookingEvent {
            metadata: stored.metadata(),
            kind: stored.decode_payload::<BookingEventKind>()?,
        };
        booking.apply(&event);
    }
    Ok(booking)
}

async fn persist(
    booking: &mut Booking,
    repo: &dyn EventRepository,
) -> Result<Vec<StoredEvent>, DomainError> {
    let stored_events: Vec<StoredEvent> = booking
        .uncommitted_events()
        .iter()
        .map(StoredEvent::from_domain_event)
        .collect();

    repo.append_events(booking.id, booking.version(), &stored_events).await?;
    booking.clear_uncommitted_events();

    Ok(stored_events)
}

/// Handles `QuoteBooking`: validates the selection, prices it on a new
/// booking aggregate and persists the `BookingQuoted` event.
///
/// # Errors
///
/// Returns `DomainError::Validation` for an invalid selection, or the
/// repository error if appending fails.
pub async fn handle_quote_booking(
    command: &QuoteBooking,
    clock: &dyn Clock,
    repo: &dyn EventRepository,
) -> Result<BookingCommandResult, DomainError> {
    command.validate()?;

    let booking_id = Uuid::new_v4();
    let mut booking = Booking::new(booking_id);

    booking.quote_booking(
        command.days,
        command.start_hour,
        command.end_hour,
        command.meeting_point.clone(),
        command.correlation_id,
        clock,
    )?;

    let stored_events = persist(&mut booking, repo).await?;
    info!(%booking_id, command = command.command_type(), "booking quoted");

    Ok(BookingCommandResult {
        aggregate_id: booking_id,
        stored_events,
    })
}

/// Handles `ConfirmBooking`: reconstitutes the booking, confirms it and
/// persists the `BookingConfirmed` event.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if the booking does not exist,
/// `DomainError::Validation` if it cannot be confirmed, or the repository
/// error if loading or appending fails.
pub async fn handle_confirm_booking(
    command: &ConfirmBooking,
    clock: &dyn Clock,
    repo: &dyn EventRepository,
) -> Result<BookingCommandResult, DomainError> {
    let existing_events = repo.load_events(command.booking_id).await?;
    if existing_events.is_empty() {
        return Err(DomainError::AggregateNotFound(command.booking_id));
    }
    let mut booking = reconstitute(command.booking_id, &existing_events)?;

    booking.confirm(command.correlation_id, clock)?;

    let stored_events = persist(&mut booking, repo).await?;
    info!(booking_id = %command.booking_id, command = command.command_type(), "booking confirmed");

    Ok(BookingCommandResult {
        aggregate_id: command.booking_id,
        stored_events,
    })
}
