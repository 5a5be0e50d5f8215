//! Inactivity threshold
//!
//! How long the owner may stay silent before the switch fires. Configurable
//! between one month and one year, in 30-day steps.

use ghostvault_core::MS_PER_DAY;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::SwitchError;

/// Shortest allowed threshold in days
pub const MIN_DAYS: u16 = 30;

/// Longest allowed threshold in days
pub const MAX_DAYS: u16 = 365;

/// Threshold granularity in days
pub const STEP_DAYS: u16 = 30;

/// Inactivity threshold in days
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct InactivityThreshold(u16);

impl InactivityThreshold {
    /// Create a threshold from a number of days.
    ///
    /// Values in range that are neither a 30-day step nor the 365-day
    /// maximum are normalized to the nearest step (ties round up).
    pub fn from_days(days: u16) -> Result<Self, SwitchError> {
        if !(MIN_DAYS..=MAX_DAYS).contains(&days) {
            return Err(SwitchError::Validation(format!(
                "inactivity threshold must be between {} and {} days, got {}",
                MIN_DAYS, MAX_DAYS, days
            )));
        }
        if days == MAX_DAYS || days % STEP_DAYS == 0 {
            return Ok(Self(days));
        }

        let rounded = ((days + STEP_DAYS / 2) / STEP_DAYS) * STEP_DAYS;
        let normalized = rounded.clamp(MIN_DAYS, MAX_DAYS);
        log::debug!(
            "Normalized inactivity threshold {} -> {} days",
            days,
            normalized
        );
        Ok(Self(normalized))
    }

    /// 30 days
    pub fn one_month() -> Self {
        Self(30)
    }

    /// 180 days
    pub fn six_months() -> Self {
        Self(180)
    }

    /// 365 days
    pub fn one_year() -> Self {
        Self(365)
    }

    pub fn days(&self) -> u16 {
        self.0
    }

    pub fn as_millis(&self) -> u64 {
        self.0 as u64 * MS_PER_DAY
    }

    pub fn as_duration(&self) -> Duration {
        Duration::from_millis(self.as_millis())
    }
}

impl Default for InactivityThreshold {
    fn default() -> Self {
        Self::six_months()
    }
}

impl TryFrom<u16> for InactivityThreshold {
    type Error = SwitchError;

    fn try_from(days: u16) -> Result<Self, Self::Error> {
        Self::from_days(days)
    }
}

impl From<InactivityThreshold> for u16 {
    fn from(t: InactivityThreshold) -> Self {
        t.0
    }
}

impl fmt::Display for InactivityThreshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 >= MAX_DAYS {
            write!(f, "~1 year ({} days)", self.0)
        } else {
            write!(f, "~{} months ({} days)", self.0 / STEP_DAYS, self.0)
        }
    }
}
