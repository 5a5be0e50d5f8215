//! Notification message templates

use serde::{Deserialize, Serialize};

/// Notification urgency level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NotificationLevel {
    /// Gentle reminder (30+ days)
    Reminder = 1,
    /// Warning (2-7 days)
    Warning = 2,
    /// Urgent (last day)
    Urgent = 3,
    /// Critical (switch fired or firing now)
    Critical = 4,
}

/// A notification message ready to send
#[derive(Debug, Clone)]
pub struct NotificationMessage {
    /// Message subject (for email)
    pub subject: String,
    /// Message body (plain text)
    pub body: String,
    pub level: NotificationLevel,
}

fn format_days(days_remaining: f64) -> String {
    if days_remaining < 1.0 {
        format!("{:.1} hours", days_remaining.max(0.0) * 24.0)
    } else if days_remaining < 2.0 {
        format!("{:.0} day", days_remaining)
    } else {
        format!("{:.0} days", days_remaining)
    }
}

/// Generate an owner check-in message for `level`.
pub fn generate_message(
    level: NotificationLevel,
    vault_label: &str,
    days_remaining: f64,
) -> NotificationMessage {
    let days_str = format_days(days_remaining);

    let (subject, body) = match level {
        NotificationLevel::Reminder => (
            format!("GhostVault: Proof of life reminder ({} remaining)", days_str),
            format!(
                r#"Hello,

This is a friendly reminder that the inheritance switch on your vault
"{}" fires in approximately {}.

To reset the countdown, open GhostVault and send a proof of life.

GhostVault"#,
                vault_label, days_str
            ),
        ),

        NotificationLevel::Warning => (
            format!("GhostVault: Proof of life WARNING ({} remaining)", days_str),
            format!(
                r#"WARNING: Proof of life required soon

The inheritance switch on your vault "{}" fires in approximately {}.

If you do not ping before then, your designated beneficiary will be
able to decrypt the vault note and claim its funds.

GhostVault"#,
                vault_label, days_str
            ),
        ),

        NotificationLevel::Urgent => (
            format!("GhostVault: URGENT - switch fires in {}!", days_str),
            format!(
                r#"URGENT: PROOF OF LIFE REQUIRED IMMEDIATELY

The inheritance switch on your vault "{}" fires in approximately {}.

Please send a proof of life NOW.

GhostVault"#,
                vault_label, days_str
            ),
        ),

        NotificationLevel::Critical => (
            "GhostVault: CRITICAL - inheritance switch FIRED or firing NOW".to_string(),
            format!(
                r#"CRITICAL: SWITCH FIRED OR FIRING NOW

The inheritance switch on your vault "{}" has fired or is about to.
Your beneficiary can now claim the vault.

If this is intentional, no action is needed.

If you are still in control:
1. Open GhostVault immediately
2. Send a proof of life
3. Move funds to a fresh note if the heir has already scanned

GhostVault"#,
                vault_label
            ),
        ),
    };

    NotificationMessage {
        subject,
        body,
        level,
    }
}

/// Generate the notice sent to the beneficiary once the switch has fired.
pub fn generate_heir_notice(vault_label: &str, heir_address: &str) -> NotificationMessage {
    NotificationMessage {
        subject: "GhostVault: An inheritance vault is ready to claim".to_string(),
        body: format!(
            r#"Hello,

You were designated as the beneficiary of the GhostVault vault "{}".
Its owner has not sent a proof of life within the agreed period, so the
vault can now be claimed by {}.

To claim:
1. Open GhostVault and scan for vaults with your beneficiary key
2. Decrypt the sealed note
3. Transfer the funds to a fresh address you control

GhostVault"#,
            vault_label, heir_address
        ),
        level: NotificationLevel::Critical,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_reminder() {
        let msg = generate_message(NotificationLevel::Reminder, "family", 25.0);
        assert!(msg.subject.contains("reminder"));
        assert!(msg.body.contains("25 days"));
        assert!(msg.body.contains("\"family\""));
    }

    #[test]
    fn test_generate_urgent() {
        let msg = generate_message(NotificationLevel::Urgent, "family", 0.5);
        assert!(msg.subject.contains("URGENT"));
        assert!(msg.body.contains("12.0 hours"));
    }

    #[test]
    fn test_generate_critical() {
        let msg = generate_message(NotificationLevel::Critical, "family", -1.0);
        assert!(msg.subject.contains("CRITICAL"));
        assert!(msg.body.contains("FIRED"));
    }

    #[test]
    fn test_heir_notice() {
        let msg = generate_heir_notice("family", "0xabc");
        assert_eq!(msg.level, NotificationLevel::Critical);
        assert!(msg.body.contains("\"family\""));
        assert!(msg.body.contains("0xabc"));
    }

    #[test]
    fn test_format_days() {
        assert_eq!(format_days(1.2), "1 day");
        assert_eq!(format_days(-3.0), "0.0 hours");
    }

    #[test]
    fn test_level_ordering() {
        assert!(NotificationLevel::Critical > NotificationLevel::Urgent);
        assert!(NotificationLevel::Urgent > NotificationLevel::Warning);
        assert!(NotificationLevel::Warning > NotificationLevel::Reminder);
    }
}
