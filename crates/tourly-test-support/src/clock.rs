//! Deterministic `Clock` implementations for tests.

use chrono::{DateTime, Utc};
use tokio::time::Instant;
use tourly_core::clock::Clock;

/// A clock that always returns a fixed point in time.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// A wall clock that follows tokio's clock.
///
/// Under `#[tokio::test(start_paused = true)]` tokio time only moves when
/// the runtime auto-advances or `tokio::time::advance` is called, so this
/// clock lets timer-driven code see wall time move in lockstep with its
/// sleeps and intervals.
#[derive(Debug, Clone, Copy)]
pub struct PausedClock {
    base: DateTime<Utc>,
    origin: Instant,
}

impl PausedClock {
    /// Starts the clock at `base`, anchored to the current tokio instant.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn starting_at(base: DateTime<Utc>) -> Self {
        Self {
            base,
            origin: Instant::now(),
        }
    }
}

impl Clock for PausedClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = chrono::Duration::from_std(self.origin.elapsed())
            .unwrap_or_else(|_| chrono::Duration::zero());
        self.base + elapsed
    }
}
