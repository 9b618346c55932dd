//! Command abstractions.

use uuid::Uuid;

/// Trait that all commands implement.
pub trait Command: Send + Sync + std::fmt::Debug {
    /// Dotted command name, e.g. `booking.quote`, used in logs.
    fn command_type(&self) -> &'static str;

    /// Correlation ID that follows the command into the events it produces.
    fn correlation_id(&self) -> Uuid;
}
