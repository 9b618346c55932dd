//! Mock `BackOfficeAlerter` implementations for tests.

use std::sync::Mutex;

use async_trait::async_trait;
use tourly_core::alert::{AlertError, BackOfficeAlerter, EscalationAlert};

/// An alerter that records every alert it is asked to send and succeeds.
#[derive(Debug, Default)]
pub struct RecordingAlerter {
    sent: Mutex<Vec<EscalationAlert>>,
}

impl RecordingAlerter {
    /// Creates an alerter with no recorded alerts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all alerts sent so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn sent_alerts(&self) -> Vec<EscalationAlert> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl BackOfficeAlerter for RecordingAlerter {
    async fn send_alert(&self, alert: &EscalationAlert) -> Result<(), AlertError> {
        self.sent.lock().unwrap().push(alert.clone());
        Ok(())
    }
}

/// An alerter that counts attempts and always fails with a 503.
#[derive(Debug, Default)]
pub struct FailingAlerter {
    attempts: Mutex<u32>,
}

impl FailingAlerter {
    /// Creates a failing alerter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns how many sends were attempted.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn attempts(&self) -> u32 {
        *self.attempts.lock().unwrap()
    }
}

#[async_trait]
impl BackOfficeAlerter for FailingAlerter {
    async fn send_alert(&self, _alert: &EscalationAlert) -> Result<(), AlertError> {
        *self.attempts.lock().unwrap() += 1;
        Err(AlertError::Rejected(503))
    }
}
