//! Startup configuration read from the environment.

use std::net::SocketAddr;
use std::time::Duration;

use rust_decimal::Decimal;
use tourly_escalation::domain::policy::EscalationPolicy;

use crate::error::AppError;

/// Server and escalation settings.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Interface to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Back-office alert endpoint. Without it alerts fail as not configured.
    pub backoffice_alert_url: Option<String>,
    /// Request timeout for the back-office call.
    pub backoffice_timeout: Duration,
    /// Reminder and penalty rules.
    pub escalation: EscalationPolicy,
}

impl AppConfig {
    /// Reads configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a variable is present but malformed.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`, applying defaults for
    /// anything it does not return.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a value is present but malformed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let defaults = EscalationPolicy::default();

        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parse_or(&lookup, "PORT", 3000_u16)?;
        let backoffice_alert_url =
            lookup("BACKOFFICE_ALERT_URL").filter(|url| !url.trim().is_empty());
        let backoffice_timeout =
            Duration::from_secs(parse_or(&lookup, "BACKOFFICE_TIMEOUT_SECS", 10_u64)?);

        let reminder_secs = parse_or(
            &lookup,
            "OVERDUE_REMINDER_INTERVAL_SECS",
            defaults.reminder_interval.as_secs(),
        )?;
        if reminder_secs == 0 {
            return Err(AppError::Config(
                "OVERDUE_REMINDER_INTERVAL_SECS must be greater than zero".to_string(),
            ));
        }
        let penalty_per_reminder: Decimal =
            parse_or(&lookup, "OVERDUE_PENALTY_PER_REMINDER", defaults.penalty_per_reminder)?;
        let penalty_cap: Decimal = parse_or(&lookup, "OVERDUE_PENALTY_CAP", defaults.penalty_cap)?;
        if penalty_per_reminder.is_sign_negative() || penalty_cap.is_sign_negative() {
            return Err(AppError::Config("overdue penalties must not be negative".to_string()));
        }
        let escalation_threshold = parse_or(
            &lookup,
            "OVERDUE_ESCALATION_THRESHOLD",
            defaults.escalation_threshold,
        )?;
        if escalation_threshold == 0 {
            return Err(AppError::Config(
                "OVERDUE_ESCALATION_THRESHOLD must be greater than zero".to_string(),
            ));
        }
        let max_reminders = lookup("OVERDUE_MAX_REMINDERS")
            .map(|raw| raw.trim().parse::<u32>())
            .transpose()
            .map_err(|e| AppError::Config(format!("OVERDUE_MAX_REMINDERS is invalid: {e}")))?;
        if max_reminders.is_some_and(|max| max < escalation_threshold) {
            return Err(AppError::Config(format!(
                "OVERDUE_MAX_REMINDERS must be at least OVERDUE_ESCALATION_THRESHOLD \
                 ({escalation_threshold}) or the back office is never alerted"
            )));
        }

        Ok(Self {
            host,
            port,
            backoffice_alert_url,
            backoffice_timeout,
            escalation: EscalationPolicy {
                reminder_interval: Duration::from_secs(reminder_secs),
                penalty_per_reminder,
                penalty_cap,
                escalation_threshold,
                max_reminders,
                ..defaults
            },
        })
    }

    /// The socket address to bind.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if host and port do not form an address.
    pub fn socket_addr(&self) -> Result<SocketAddr, AppError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))
    }
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("{key} is invalid: {e}"))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use rust_decimal_macros::dec;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, AppError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_apply_when_nothing_is_set() {
        let config = config_from(&[]).unwrap();

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert!(config.backoffice_alert_url.is_none());
        assert_eq!(config.backoffice_timeout, Duration::from_secs(10));
        assert_eq!(config.escalation, EscalationPolicy::default());
    }

    #[test]
    fn test_overrides_are_parsed() {
        // Arrange
        let pairs = [
            ("PORT", "8080"),
            ("BACKOFFICE_ALERT_URL", "https://backoffice.example/alerts"),
            ("OVERDUE_REMINDER_INTERVAL_SECS", "60"),
            ("OVERDUE_PENALTY_PER_REMINDER", "12.50"),
            ("OVERDUE_PENALTY_CAP", "50"),
            ("OVERDUE_ESCALATION_THRESHOLD", "3"),
            ("OVERDUE_MAX_REMINDERS", "10"),
        ];

        // Act
        let config = config_from(&pairs).unwrap();

        // Assert
        assert_eq!(config.port, 8080);
        assert_eq!(
            config.backoffice_alert_url.as_deref(),
            Some("https://backoffice.example/alerts")
        );
        assert_eq!(config.escalation.reminder_interval, Duration::from_secs(60));
        assert_eq!(config.escalation.penalty_per_reminder, dec!(12.50));
        assert_eq!(config.escalation.penalty_cap, dec!(50));
        assert_eq!(config.escalation.escalation_threshold, 3);
        assert_eq!(config.escalation.max_reminders, Some(10));
        assert_eq!(config.escalation.tick_interval, Duration::from_secs(1));
    }

    #[test]
    fn test_malformed_port_is_a_config_error() {
        let result = config_from(&[("PORT", "eighty")]);

        assert!(matches!(result, Err(AppError::Config(msg)) if msg.contains("PORT")));
    }

    #[test]
    fn test_zero_reminder_interval_is_rejected() {
        let result = config_from(&[("OVERDUE_REMINDER_INTERVAL_SECS", "0")]);

        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_zero_escalation_threshold_is_rejected() {
        let result = config_from(&[("OVERDUE_ESCALATION_THRESHOLD", "0")]);

        let Err(AppError::Config(msg)) = result else {
            panic!("expected a config error");
        };
        assert!(msg.contains("OVERDUE_ESCALATION_THRESHOLD"));
    }

    #[test]
    fn test_reminder_limit_below_escalation_threshold_is_rejected() {
        // Arrange
        let pairs = [("OVERDUE_MAX_REMINDERS", "3")];

        // Act
        let result = config_from(&pairs);

        // Assert
        let Err(AppError::Config(msg)) = result else {
            panic!("expected a config error");
        };
        assert!(msg.contains("OVERDUE_MAX_REMINDERS"));
    }

    #[test]
    fn test_reminder_limit_equal_to_threshold_is_accepted() {
        let config = config_from(&[
            ("OVERDUE_ESCALATION_THRESHOLD", "4"),
            ("OVERDUE_MAX_REMINDERS", "4"),
        ])
        .unwrap();

        assert_eq!(config.escalation.escalation_threshold, 4);
        assert_eq!(config.escalation.max_reminders, Some(4));
    }

    #[test]
    fn test_malformed_reminder_limit_is_a_config_error() {
        let result = config_from(&[("OVERDUE_MAX_REMINDERS", "many")]);

        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_blank_alert_url_counts_as_unset() {
        let config = config_from(&[("BACKOFFICE_ALERT_URL", "  ")]).unwrap();

        assert!(config.backoffice_alert_url.is_none());
    }

    #[test]
    fn test_socket_addr_combines_host_and_port() {
        let config = config_from(&[("HOST", "127.0.0.1"), ("PORT", "4000")]).unwrap();

        assert_eq!(config.socket_addr().unwrap().to_string(), "127.0.0.1:4000");
    }
}
