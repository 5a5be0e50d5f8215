//! Heartbeat evaluation for liveness records.
//!
//! Pure logic: takes a record and the current time, returns a
//! recommendation. The caller (daemon, UI) decides whether to act on it.
//!
//! ```text
//! |--- Healthy ---|--- CheckinRecommended ---|--- CheckinRequired ---|--- Expired
//! 0%             50%                        90%                    100%
//! ```
//!
//! Thresholds are configurable.

use ghostvault_core::Timestamp;
use serde::{Deserialize, Serialize};

use crate::liveness::{LivenessRecord, Remaining};
use crate::SwitchError;

/// Heartbeat configuration: when to recommend a ping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatConfig {
    /// Fraction of the threshold elapsed before recommending a ping (0.0–1.0).
    /// Default: 0.5 (halfway point).
    pub checkin_threshold: f64,

    /// Fraction of the threshold elapsed before a ping is critical (0.0–1.0).
    /// Default: 0.9.
    pub critical_threshold: f64,

    /// How often the caller should re-evaluate (seconds). Advisory only.
    pub poll_interval_secs: u64,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            checkin_threshold: 0.5,
            critical_threshold: 0.9,
            poll_interval_secs: 3600,
        }
    }
}

impl HeartbeatConfig {
    /// Validate that thresholds are sensible.
    pub fn validate(&self) -> Result<(), SwitchError> {
        if self.checkin_threshold <= 0.0 || self.checkin_threshold >= 1.0 {
            return Err(SwitchError::Validation(
                "checkin_threshold must be between 0.0 and 1.0 exclusive".into(),
            ));
        }
        if self.critical_threshold <= self.checkin_threshold || self.critical_threshold >= 1.0 {
            return Err(SwitchError::Validation(
                "critical_threshold must be between checkin_threshold and 1.0 exclusive".into(),
            ));
        }
        Ok(())
    }
}

/// What the heartbeat recommends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeartbeatAction {
    /// Far from firing. No action needed.
    Healthy,
    /// Past the check-in threshold. Should ping soon.
    CheckinRecommended,
    /// Past the critical threshold. Must ping now.
    CheckinRequired,
    /// Switch fired. The heir can claim.
    Expired,
}

impl HeartbeatAction {
    fn priority(self) -> u8 {
        match self {
            HeartbeatAction::Expired => 0,
            HeartbeatAction::CheckinRequired => 1,
            HeartbeatAction::CheckinRecommended => 2,
            HeartbeatAction::Healthy => 3,
        }
    }
}

/// Full heartbeat status for one record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatStatus {
    /// Vault label (for display).
    pub label: String,
    pub remaining: Remaining,
    /// Fraction of the threshold elapsed (0.0–1.0+).
    pub elapsed_fraction: f64,
    pub action: HeartbeatAction,
}

/// Evaluate the heartbeat of a liveness record at `now`.
pub fn evaluate_heartbeat(
    label: &str,
    record: &LivenessRecord,
    now: Timestamp,
    config: &HeartbeatConfig,
) -> HeartbeatStatus {
    let elapsed_fraction = record.elapsed_fraction(now);

    let action = if record.is_fired(now) {
        HeartbeatAction::Expired
    } else if elapsed_fraction >= config.critical_threshold {
        HeartbeatAction::CheckinRequired
    } else if elapsed_fraction >= config.checkin_threshold {
        HeartbeatAction::CheckinRecommended
    } else {
        HeartbeatAction::Healthy
    };

    HeartbeatStatus {
        label: label.to_string(),
        remaining: record.remaining(now),
        elapsed_fraction,
        action,
    }
}

/// Batch evaluate several records.
///
/// Returns statuses sorted by urgency (most urgent first).
pub fn evaluate_batch(
    records: &[(String, LivenessRecord)],
    now: Timestamp,
    config: &HeartbeatConfig,
) -> Vec<HeartbeatStatus> {
    let mut statuses: Vec<HeartbeatStatus> = records
        .iter()
        .map(|(label, record)| evaluate_heartbeat(label, record, now, config))
        .collect();

    statuses.sort_by(|a, b| {
        a.action.priority().cmp(&b.action.priority()).then(
            a.elapsed_fraction
                .partial_cmp(&b.elapsed_fraction)
                .unwrap_or(std::cmp::Ordering::Equal)
                .reverse(),
        )
    });

    statuses
}
