//! Server configuration, parsed from a TOML file plus environment overrides.
//!
//! Priority: environment variables > config file > defaults.

use anyhow::{Context, Result};
use ghostvault_notify::{EmailConfig, NotifyConfig, Threshold};
use ghostvault_switch::{BeneficiaryDesignation, InactivityThreshold};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// General server settings
    #[serde(default)]
    pub server: ServerSection,

    /// The vault whose switch is monitored
    pub vault: VaultSection,

    /// Notification settings
    #[serde(default)]
    pub notifications: NotificationSection,
}

/// General server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    /// Data directory (state file)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Check interval in seconds (default: 1 hour)
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,

    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            check_interval_secs: default_check_interval(),
            log_level: default_log_level(),
        }
    }
}

/// Vault and beneficiary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultSection {
    /// Human-readable label for this vault
    #[serde(default = "default_vault_label")]
    pub label: String,

    /// Owner identity the liveness proofs are issued for
    pub owner: String,

    /// Inactivity threshold in days (30 to 365)
    #[serde(default = "default_threshold_days")]
    pub threshold_days: u16,

    /// Beneficiary destination identifier
    pub heir_address: String,

    /// Beneficiary contact for the "switch fired" notice
    #[serde(default)]
    pub heir_email: Option<String>,
}

/// Notification channel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationSection {
    /// Notification thresholds in days before firing
    #[serde(default = "default_thresholds")]
    pub threshold_days: Vec<u32>,

    /// Email notification settings
    pub email: Option<EmailNotifySection>,
}

impl Default for NotificationSection {
    fn default() -> Self {
        Self {
            threshold_days: default_thresholds(),
            email: None,
        }
    }
}

/// Email notification settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailNotifySection {
    pub smtp_host: String,

    /// SMTP port (default: 587)
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    pub smtp_user: String,
    pub smtp_password: String,

    /// Sender address
    pub from_address: String,

    /// Owner's email for proof-of-life reminders
    pub owner_email: String,
}

// ============================================================================
// Default value functions
// ============================================================================

fn default_data_dir() -> PathBuf {
    PathBuf::from("/data")
}

fn default_check_interval() -> u64 {
    3600
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_vault_label() -> String {
    "inheritance".to_string()
}

fn default_threshold_days() -> u16 {
    180
}

fn default_thresholds() -> Vec<u32> {
    vec![30, 7, 1, 0]
}

fn default_smtp_port() -> u16 {
    587
}

// ============================================================================
// Loading & environment override
// ============================================================================

impl ServerConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: ServerConfig =
            toml::from_str(&contents).with_context(|| "Failed to parse TOML config")?;
        Ok(config)
    }

    /// Apply environment variable overrides.
    ///
    /// Supported env vars:
    /// - `GHOSTVAULT_DATA_DIR`
    /// - `GHOSTVAULT_CHECK_INTERVAL`
    /// - `GHOSTVAULT_LOG_LEVEL`
    /// - `GHOSTVAULT_THRESHOLD_DAYS`
    /// - `GHOSTVAULT_HEIR_ADDRESS`
    /// - `GHOSTVAULT_HEIR_EMAIL`
    /// - `GHOSTVAULT_SMTP_PASSWORD`
    pub fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("GHOSTVAULT_DATA_DIR") {
            self.server.data_dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("GHOSTVAULT_CHECK_INTERVAL") {
            if let Ok(secs) = v.parse::<u64>() {
                self.server.check_interval_secs = secs;
            }
        }
        if let Ok(v) = std::env::var("GHOSTVAULT_LOG_LEVEL") {
            self.server.log_level = v;
        }
        if let Ok(v) = std::env::var("GHOSTVAULT_THRESHOLD_DAYS") {
            if let Ok(days) = v.parse::<u16>() {
                self.vault.threshold_days = days;
            }
        }
        if let Ok(v) = std::env::var("GHOSTVAULT_HEIR_ADDRESS") {
            self.vault.heir_address = v;
        }
        if let Ok(v) = std::env::var("GHOSTVAULT_HEIR_EMAIL") {
            self.vault.heir_email = Some(v);
        }
        if let Ok(v) = std::env::var("GHOSTVAULT_SMTP_PASSWORD") {
            if let Some(ref mut email) = self.notifications.email {
                email.smtp_password = v;
            }
        }
    }

    /// The configured threshold, normalized to a 30-day step.
    pub fn threshold(&self) -> Result<InactivityThreshold> {
        InactivityThreshold::from_days(self.vault.threshold_days)
            .with_context(|| format!("invalid vault.threshold_days: {}", self.vault.threshold_days))
    }

    /// The configured heir. Not yet designated; that needs the key registry.
    pub fn beneficiary(&self) -> Result<BeneficiaryDesignation> {
        BeneficiaryDesignation::new(&self.vault.heir_address, self.vault.heir_email.as_deref())
            .context("invalid beneficiary")
    }

    /// Path of the persisted vault state.
    pub fn state_path(&self) -> PathBuf {
        self.server.data_dir.join("vault_state.json")
    }

    /// Notification settings in the form the notify crate takes.
    pub fn notify_config(&self) -> NotifyConfig {
        NotifyConfig {
            thresholds: self
                .notifications
                .threshold_days
                .iter()
                .map(|&d| Threshold::days(d))
                .collect(),
            email: self.notifications.email.as_ref().map(|e| EmailConfig {
                enabled: true,
                smtp_host: e.smtp_host.clone(),
                smtp_port: e.smtp_port,
                smtp_user: e.smtp_user.clone(),
                smtp_password: e.smtp_password.clone(),
                from_address: e.from_address.clone(),
                to_address: e.owner_email.clone(),
            }),
        }
    }

    /// Validate that the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            !self.vault.owner.trim().is_empty(),
            "vault.owner must not be empty"
        );

        self.threshold()?;
        self.beneficiary()?;

        // Check interval must be at least 60 seconds
        anyhow::ensure!(
            self.server.check_interval_secs >= 60,
            "server.check_interval_secs must be >= 60"
        );

        if let Some(ref email) = self.notifications.email {
            anyhow::ensure!(
                !email.smtp_host.is_empty(),
                "notifications.email.smtp_host must not be empty"
            );
            anyhow::ensure!(
                !email.from_address.is_empty(),
                "notifications.email.from_address must not be empty"
            );
            anyhow::ensure!(
                !email.owner_email.is_empty(),
                "notifications.email.owner_email must not be empty"
            );
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn minimal_toml() -> &'static str {
        r#"
[vault]
owner = "owner-1"
heir_address = "0x71c7656ec7ab88b098defb751b7401b5f6d8976f"
"#
    }

    fn full_toml() -> &'static str {
        r#"
[server]
data_dir = "/custom/data"
check_interval_secs = 600
log_level = "debug"

[vault]
label = "family"
owner = "owner-1"
threshold_days = 90
heir_address = "0x71c7656ec7ab88b098defb751b7401b5f6d8976f"
heir_email = "heir@example.com"

[notifications]
threshold_days = [30, 14, 7, 3, 1, 0]

[notifications.email]
smtp_host = "smtp.example.com"
smtp_port = 587
smtp_user = "user@example.com"
smtp_password = "secret"
from_address = "vault@example.com"
owner_email = "owner@example.com"
"#
    }

    fn load(toml: &str) -> ServerConfig {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", toml).unwrap();
        ServerConfig::from_file(file.path()).unwrap()
    }

    #[test]
    fn test_parse_minimal_config() {
        let config = load(minimal_toml());
        assert_eq!(config.vault.threshold_days, 180); // default
        assert_eq!(config.vault.label, "inheritance"); // default
        assert_eq!(config.server.check_interval_secs, 3600); // default
        assert!(config.vault.heir_email.is_none());
        assert!(config.notifications.email.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_config() {
        let config = load(full_toml());

        assert_eq!(config.server.data_dir, PathBuf::from("/custom/data"));
        assert_eq!(config.server.check_interval_secs, 600);
        assert_eq!(config.server.log_level, "debug");
        assert_eq!(config.vault.label, "family");
        assert_eq!(config.threshold().unwrap().days(), 90);
        assert_eq!(config.vault.heir_email.as_deref(), Some("heir@example.com"));

        let email = config.notifications.email.as_ref().unwrap();
        assert_eq!(email.smtp_host, "smtp.example.com");
        assert_eq!(email.owner_email, "owner@example.com");

        let notify = config.notify_config();
        assert_eq!(notify.thresholds.len(), 6);
        assert_eq!(
            notify.email.as_ref().map(|e| e.to_address.as_str()),
            Some("owner@example.com")
        );
        assert_eq!(
            config.state_path(),
            PathBuf::from("/custom/data/vault_state.json")
        );
    }

    #[test]
    fn test_missing_vault_section_is_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "[server]\nlog_level = \"info\"\n").unwrap();
        assert!(ServerConfig::from_file(file.path()).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = load(minimal_toml());

        std::env::set_var("GHOSTVAULT_DATA_DIR", "/env/data");
        std::env::set_var("GHOSTVAULT_CHECK_INTERVAL", "1800");
        std::env::set_var("GHOSTVAULT_THRESHOLD_DAYS", "60");

        config.apply_env_overrides();

        assert_eq!(config.server.data_dir, PathBuf::from("/env/data"));
        assert_eq!(config.server.check_interval_secs, 1800);
        assert_eq!(config.vault.threshold_days, 60);

        std::env::remove_var("GHOSTVAULT_DATA_DIR");
        std::env::remove_var("GHOSTVAULT_CHECK_INTERVAL");
        std::env::remove_var("GHOSTVAULT_THRESHOLD_DAYS");
    }

    #[test]
    fn test_validation_threshold_range() {
        let mut config = load(minimal_toml());

        config.vault.threshold_days = 20;
        assert!(config.validate().is_err());

        config.vault.threshold_days = 400;
        assert!(config.validate().is_err());

        config.vault.threshold_days = 365;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_empty_owner_and_heir() {
        let mut config = load(minimal_toml());
        config.vault.owner = " ".into();
        assert!(config.validate().is_err());

        let mut config = load(minimal_toml());
        config.vault.heir_address = String::new();
        assert!(config.validate().is_err());

        let mut config = load(minimal_toml());
        config.vault.heir_email = Some("nope".into());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_check_interval_too_low() {
        let mut config = load(minimal_toml());
        config.server.check_interval_secs = 30;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_thresholds() {
        let config = load(minimal_toml());
        assert_eq!(config.notifications.threshold_days, vec![30, 7, 1, 0]);
    }

    #[test]
    fn test_serde_roundtrip() {
        let config = load(full_toml());
        let serialized = toml::to_string_pretty(&config).unwrap();

        let reparsed: ServerConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(reparsed.vault.threshold_days, config.vault.threshold_days);
        assert_eq!(reparsed.vault.heir_address, config.vault.heir_address);
    }
}
