//! Back-office alert delivery over HTTP.

use std::time::Duration;

use async_trait::async_trait;
use tourly_core::alert::{AlertError, BackOfficeAlerter, EscalationAlert};
use tracing::debug;

/// Posts escalation alerts as JSON to a single back-office endpoint.
///
/// One request per alert. Any 2xx is an acknowledgement; everything else
/// is reported to the caller, which decides not to retry.
#[derive(Debug, Clone)]
pub struct HttpBackOfficeAlerter {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpBackOfficeAlerter {
    /// Builds an alerter with a request timeout.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::Transport` if the HTTP client cannot be built.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, AlertError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("tourly/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AlertError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self::from_reqwest(endpoint, client))
    }

    /// Wraps an existing client.
    #[must_use]
    pub fn from_reqwest(endpoint: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    /// The configured endpoint URL.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl BackOfficeAlerter for HttpBackOfficeAlerter {
    async fn send_alert(&self, alert: &EscalationAlert) -> Result<(), AlertError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(alert)
            .send()
            .await
            .map_err(|e| AlertError::Transport(e.to_string()))?;

        let status = response.status();
        debug!(order_id = %alert.order_id, status = status.as_u16(), "back office responded");
        if status.is_success() {
            Ok(())
        } else {
            Err(AlertError::Rejected(status.as_u16()))
        }
    }
}

/// Stands in when no endpoint is configured. Every alert fails with
/// `AlertError::NotConfigured`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredAlerter;

#[async_trait]
impl BackOfficeAlerter for UnconfiguredAlerter {
    async fn send_alert(&self, _alert: &EscalationAlert) -> Result<(), AlertError> {
        Err(AlertError::NotConfigured)
    }
}
