//! Notification configuration

use crate::templates::NotificationLevel;
use serde::{Deserialize, Serialize};

/// Main notification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Thresholds that trigger notifications
    pub thresholds: Vec<Threshold>,
    /// Email configuration (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<EmailConfig>,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            thresholds: vec![
                Threshold::days(30), // Gentle reminder
                Threshold::days(7),  // Warning
                Threshold::days(1),  // Urgent
                Threshold::days(0),  // Critical, heir can claim
            ],
            email: None,
        }
    }
}

impl NotifyConfig {
    /// Build a config from a list of day counts, each mapped to its default level.
    pub fn with_days(days: &[u32]) -> Self {
        Self {
            thresholds: days.iter().copied().map(Threshold::days).collect(),
            email: None,
        }
    }

    /// Any channel able to deliver a message.
    pub fn has_enabled_channel(&self) -> bool {
        self.email.as_ref().is_some_and(|e| e.enabled)
    }
}

/// A notification threshold
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Threshold {
    /// Days before firing to trigger
    pub days: u32,
    /// Notification level
    pub level: NotificationLevel,
}

impl Threshold {
    /// Create a threshold at the given number of days
    pub fn days(days: u32) -> Self {
        let level = match days {
            8.. => NotificationLevel::Reminder,
            2..=7 => NotificationLevel::Warning,
            1 => NotificationLevel::Urgent,
            0 => NotificationLevel::Critical,
        };
        Self { days, level }
    }

    pub fn custom(days: u32, level: NotificationLevel) -> Self {
        Self { days, level }
    }
}

/// Email (SMTP) configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    /// Enable email notifications
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// SMTP server hostname
    pub smtp_host: String,
    /// SMTP port (typically 587 for TLS)
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    pub smtp_user: String,
    pub smtp_password: String,
    /// Sender email address
    pub from_address: String,
    /// Owner's email address
    pub to_address: String,
}

fn default_enabled() -> bool {
    true
}

fn default_smtp_port() -> u16 {
    587
}

impl EmailConfig {
    pub fn new(
        smtp_host: impl Into<String>,
        smtp_user: impl Into<String>,
        smtp_password: impl Into<String>,
        from_address: impl Into<String>,
        to_address: impl Into<String>,
    ) -> Self {
        Self {
            enabled: true,
            smtp_host: smtp_host.into(),
            smtp_port: default_smtp_port(),
            smtp_user: smtp_user.into(),
            smtp_password: smtp_password.into(),
            from_address: from_address.into(),
            to_address: to_address.into(),
        }
    }
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("enabled", &self.enabled)
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_user", &self.smtp_user)
            .field("smtp_password", &"[redacted]")
            .field("from_address", &self.from_address)
            .field("to_address", &self.to_address)
            .finish()
    }
}
