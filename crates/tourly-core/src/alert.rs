//! Back-office alerting port.
//!
//! The overdue monitor raises at most one alert per order through this
//! trait. The payload field names are a wire contract with the existing
//! back office and must not change.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Payload sent to the back office when an overdue order escalates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscalationAlert {
    /// The overdue order.
    pub order_id: Uuid,
    /// Guide assigned to the order.
    pub guide_name: String,
    /// Reminder count at the moment of escalation.
    pub reminder_count: u32,
    /// Penalty accrued so far.
    pub accrued_penalty: Decimal,
    /// When the order should have ended.
    pub scheduled_end_time: DateTime<Utc>,
    /// When the alert was raised.
    pub alert_timestamp: DateTime<Utc>,
}

/// Failure to deliver an escalation alert.
#[derive(Debug, Error)]
pub enum AlertError {
    /// No back-office endpoint is configured.
    #[error("back-office endpoint is not configured")]
    NotConfigured,

    /// The back office answered with a non-success status.
    #[error("back office rejected alert with status {0}")]
    Rejected(u16),

    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Outbound port to the back-office alerting endpoint.
#[async_trait]
pub trait BackOfficeAlerter: Send + Sync {
    /// Delivers one alert. Implementations must not retry.
    async fn send_alert(&self, alert: &EscalationAlert) -> Result<(), AlertError>;
}
