//! Commands for the Overdue Escalation context.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tourly_core::command::Command;
use tourly_core::error::DomainError;
use uuid::Uuid;

/// Command to start monitoring an order that has just become active.
#[derive(Debug, Clone)]
pub struct ActivateOrder {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The order identifier.
    pub order_id: Uuid,
    /// Guide assigned to the order.
    pub guide_name: String,
    /// When the service is scheduled to end.
    pub scheduled_end_time: DateTime<Utc>,
}

impl ActivateOrder {
    /// Checks the activation payload.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the guide name is blank.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.guide_name.trim().is_empty() {
            return Err(DomainError::Validation(
                "guide name must not be empty".to_owned(),
            ));
        }
        Ok(())
    }
}

impl Command for ActivateOrder {
    fn command_type(&self) -> &'static str {
        "escalation.activate_order"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Who asked for an order to be ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndRequester {
    /// The customer or guide in the app.
    User,
    /// A back-office operator.
    Operator,
}

/// Command to manually end an order.
#[derive(Debug, Clone)]
pub struct EndOrder {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The order identifier.
    pub order_id: Uuid,
    /// Origin of the request.
    pub requested_by: EndRequester,
}

impl Command for EndOrder {
    fn command_type(&self) -> &'static str {
        "escalation.end_order"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}
