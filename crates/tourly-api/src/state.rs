//! Shared application state.

use std::sync::Arc;

use tourly_core::clock::Clock;
use tourly_core::repository::EventRepository;
use tourly_escalation::application::registry::MonitorRegistry;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Time source for commands and monitors.
    pub clock: Arc<dyn Clock>,
    /// Booking event streams.
    pub event_repository: Arc<dyn EventRepository>,
    /// Live overdue monitors for active orders.
    pub monitors: Arc<MonitorRegistry>,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        event_repository: Arc<dyn EventRepository>,
        monitors: Arc<MonitorRegistry>,
    ) -> Self {
        Self {
            clock,
            event_repository,
            monitors,
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("monitors", &self.monitors)
            .finish_non_exhaustive()
    }
}
