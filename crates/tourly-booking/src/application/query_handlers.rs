//! Query handlers for the Booking & Pricing context.

use serde::Serialize;
use tourly_core::aggregate::AggregateRoot;
use tourly_core::error::DomainError;
use tourly_core::repository::EventRepository;
use uuid::Uuid;

use crate::application::command_handlers;
use crate::domain::aggregates::BookingStatus;
use crate::domain::pricing::BookingQuote;

/// Read-only view of a booking aggregate.
#[derive(Debug, Serialize)]
pub struct BookingView {
    /// The booking identifier.
    pub booking_id: Uuid,
    /// Lifecycle status.
    pub status: BookingStatus,
    /// Attached price breakdown.
    pub quote: Option<BookingQuote>,
    /// Confirmed meeting point.
    pub meeting_point: Option<String>,
    /// Current version (event count).
    pub version: i64,
}

/// Retrieves a booking by its aggregate ID.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if no events exist for the ID.
/// Returns `DomainError::Infrastructure` if event deserialization fails.
pub async fn get_booking_by_id(
    booking_id: Uuid,
    repo: &dyn EventRepository,
) -> Result<BookingView, DomainError> {
    let stored_events = repo.load_events(booking_id).await?;
    if stored_events.is_empty() {
        return Err(DomainError::AggregateNotFound(booking_id));
    }
    let booking = command_handlers::reconstitute(booking_id, &stored_events)?;
    Ok(BookingView {
        booking_id,
        status: booking.status(),
        quote: booking.quote().cloned(),
        meeting_point: booking.meeting_point.clone(),
        version: booking.version(),
    })
}
