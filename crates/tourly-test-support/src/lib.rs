//! Shared test mocks and utilities for the Tourly booking engine.

mod alerter;
mod clock;
mod repository;

pub use alerter::{FailingAlerter, RecordingAlerter};
pub use clock::{FixedClock, PausedClock};
pub use repository::{EmptyEventRepository, FailingEventRepository, RecordingEventRepository};
