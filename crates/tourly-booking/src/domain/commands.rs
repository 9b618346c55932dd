//! Commands for the Booking & Pricing context.

use tourly_core::command::Command;
use tourly_core::error::DomainError;
use uuid::Uuid;

use super::pricing::{CLOSING_HOUR, MIN_BILLABLE_HOURS, OPENING_HOUR};

/// Command to price and record a new booking.
#[derive(Debug, Clone)]
pub struct QuoteBooking {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Number of booked days.
    pub days: u32,
    /// Daily start hour.
    pub start_hour: u32,
    /// Daily end hour.
    pub end_hour: u32,
    /// Confirmed meeting point label.
    pub meeting_point: String,
}

impl QuoteBooking {
    /// Checks the booking-flow preconditions the pricing engine relies on.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if `days` is zero, either hour is
    /// outside opening hours, the window is shorter than the billable
    /// minimum, or the meeting point is blank.
    pub fn validate(&self) -> Result<(), DomainError> {
        validate_selection(self.days, self.start_hour, self.end_hour)?;
        if self.meeting_point.trim().is_empty() {
            return Err(DomainError::Validation(
                "meeting point must not be empty".to_owned(),
            ));
        }
        Ok(())
    }
}

impl Command for QuoteBooking {
    fn command_type(&self) -> &'static str {
        "booking.quote"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to confirm a quoted booking.
#[derive(Debug, Clone)]
pub struct ConfirmBooking {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The booking to confirm.
    pub booking_id: Uuid,
}

impl Command for ConfirmBooking {
    fn command_type(&self) -> &'static str {
        "booking.confirm"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Validates a day count and daily window before pricing.
///
/// # Errors
///
/// Returns `DomainError::Validation` describing the first violated rule.
pub fn validate_selection(days: u32, start_hour: u32, end_hour: u32) -> Result<(), DomainError> {
    if days < 1 {
        return Err(DomainError::Validation(
            "at least one day must be booked".to_owned(),
        ));
    }
    for hour in [start_hour, end_hour] {
        if !(OPENING_HOUR..=CLOSING_HOUR).contains(&hour) {
            return Err(DomainError::Validation(format!(
                "hour {hour} is outside {OPENING_HOUR}..={CLOSING_HOUR}"
            )));
        }
    }
    if end_hour < start_hour + MIN_BILLABLE_HOURS {
        return Err(DomainError::Validation(format!(
            "window {start_hour}-{end_hour} is shorter than {MIN_BILLABLE_HOURS} hours"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(days: u32, start_hour: u32, end_hour: u32) -> QuoteBooking {
        QuoteBooking {
            correlation_id: Uuid::new_v4(),
            days,
            start_hour,
            end_hour,
            meeting_point: "Old Town Gate".to_owned(),
        }
    }

    #[test]
    fn test_validate_accepts_minimum_window() {
        assert!(command(1, 8, 11).validate().is_ok());
        assert!(command(1, 18, 21).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_days() {
        let err = command(0, 8, 12).validate().unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn test_validate_rejects_short_and_inverted_windows() {
        assert!(command(1, 8, 10).validate().is_err());
        assert!(command(1, 12, 9).validate().is_err());
    }

    #[test]
    fn test_validate_rejects_hours_outside_opening_hours() {
        assert!(command(1, 7, 12).validate().is_err());
        assert!(command(1, 18, 22).validate().is_err());
    }

    #[test]
    fn test_validate_rejects_blank_meeting_point() {
        let mut cmd = command(2, 8, 12);
        cmd.meeting_point = "   ".to_owned();

        let err = cmd.validate().unwrap_err();

        assert!(matches!(err, DomainError::Validation(_)));
    }
}
