//! GhostVault Notification Service
//!
//! Warns the owner before the inheritance switch fires, and tells the
//! beneficiary once it has.
//!
//! # Delivery
//!
//! - **Email**: SMTP with user-provided credentials
//!
//! # Example
//!
//! ```ignore
//! use ghostvault_notify::{EmailConfig, NotificationService, NotifyConfig, Threshold};
//!
//! let config = NotifyConfig {
//!     thresholds: vec![Threshold::days(30), Threshold::days(7), Threshold::days(1)],
//!     email: Some(EmailConfig::new(...)),
//! };
//!
//! let service = NotificationService::new(config);
//! service.check_and_notify("family", days_remaining).await?;
//! ```

mod config;
mod smtp;
pub mod templates;

pub use config::{EmailConfig, NotifyConfig, Threshold};
pub use templates::{NotificationLevel, NotificationMessage};

use thiserror::Error;

/// Errors from notification operations
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Email send failed: {0}")]
    EmailFailed(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Notification service for proof-of-life reminders and heir notices
pub struct NotificationService {
    config: NotifyConfig,
}

impl NotificationService {
    pub fn new(config: NotifyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &NotifyConfig {
        &self.config
    }

    /// The most urgent level whose threshold `days_remaining` has reached.
    pub fn triggered_level(&self, days_remaining: f64) -> Option<NotificationLevel> {
        self.config
            .thresholds
            .iter()
            .filter(|t| days_remaining <= t.days as f64)
            .map(|t| t.level)
            .max()
    }

    /// Check the countdown and notify the owner if a threshold is reached.
    ///
    /// # Returns
    /// The level that was sent, or `None` when no threshold triggered
    pub async fn check_and_notify(
        &self,
        vault_label: &str,
        days_remaining: f64,
    ) -> Result<Option<NotificationLevel>, NotifyError> {
        let Some(level) = self.triggered_level(days_remaining) else {
            return Ok(None);
        };

        let message = templates::generate_message(level, vault_label, days_remaining);
        self.deliver(&message, None).await?;
        Ok(Some(level))
    }

    /// Tell the beneficiary the switch fired and the vault can be claimed.
    pub async fn notify_heir(
        &self,
        vault_label: &str,
        heir_email: &str,
        heir_address: &str,
    ) -> Result<(), NotifyError> {
        let message = templates::generate_heir_notice(vault_label, heir_address);
        self.deliver(&message, Some(heir_email)).await
    }

    /// Send through every enabled channel. Succeeds if any channel did.
    async fn deliver(
        &self,
        message: &NotificationMessage,
        recipient: Option<&str>,
    ) -> Result<(), NotifyError> {
        let mut sent_any = false;

        if let Some(ref email_config) = self.config.email {
            if email_config.enabled {
                let result = match recipient {
                    Some(to) => smtp::send_email_to_recipient(email_config, to, message).await,
                    None => smtp::send_email(email_config, message).await,
                };
                match result {
                    Ok(()) => sent_any = true,
                    Err(e) => log::error!("Email notification failed: {}", e),
                }
            }
        }

        if sent_any {
            Ok(())
        } else {
            Err(NotifyError::Config(
                "No notification channels enabled or all failed".into(),
            ))
        }
    }
}
