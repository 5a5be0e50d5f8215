//! Inactivity timer
//!
//! Tracks the owner's last proof of life against the inactivity threshold.
//! Firing is a pure predicate over the current time; nothing is latched here.
//!
//! ```text
//! last_ping                                    unlock_time
//!     |------------- threshold ---------------------|
//!     armed                                          fired
//! ```

use ghostvault_core::{Clock, ProofRequest, ProofService, Timestamp, MS_PER_DAY};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::threshold::InactivityThreshold;
use crate::SwitchError;

const MS_PER_HOUR: u64 = 60 * 60 * 1000;
const MS_PER_MINUTE: u64 = 60 * 1000;
const MS_PER_SECOND: u64 = 1000;

/// Time left before the switch fires, split for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Remaining {
    pub total_ms: u64,
    pub days: u64,
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
}

impl Remaining {
    pub fn from_millis(total_ms: u64) -> Self {
        Self {
            total_ms,
            days: total_ms / MS_PER_DAY,
            hours: (total_ms % MS_PER_DAY) / MS_PER_HOUR,
            minutes: (total_ms % MS_PER_HOUR) / MS_PER_MINUTE,
            seconds: (total_ms % MS_PER_MINUTE) / MS_PER_SECOND,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.total_ms == 0
    }

    /// Fractional days, for thresholds and messages.
    pub fn as_days_f64(&self) -> f64 {
        self.total_ms as f64 / MS_PER_DAY as f64
    }
}

impl std::fmt::Display for Remaining {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}d {}h {}m {}s",
            self.days, self.hours, self.minutes, self.seconds
        )
    }
}

/// Last proof of life and the configured threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LivenessRecord {
    pub last_ping: Timestamp,
    pub threshold: InactivityThreshold,
}

impl LivenessRecord {
    pub fn new(created_at: Timestamp, threshold: InactivityThreshold) -> Self {
        Self {
            last_ping: created_at,
            threshold,
        }
    }

    /// `last_ping + threshold`
    pub fn unlock_time(&self) -> Timestamp {
        self.last_ping.saturating_add(self.threshold.as_duration())
    }

    /// `max(0, unlock_time - now)`
    pub fn remaining(&self, now: Timestamp) -> Remaining {
        Remaining::from_millis(self.unlock_time().millis_since(now))
    }

    pub fn is_fired(&self, now: Timestamp) -> bool {
        now >= self.unlock_time()
    }

    /// Fraction of the threshold elapsed since the last ping (0.0 to 1.0+).
    pub fn elapsed_fraction(&self, now: Timestamp) -> f64 {
        now.millis_since(self.last_ping) as f64 / self.threshold.as_millis() as f64
    }

    /// Record a ping. The timestamp never moves backwards.
    pub fn touch(&mut self, now: Timestamp) {
        if now > self.last_ping {
            self.last_ping = now;
        }
    }
}

/// Inactivity timer engine for one vault.
pub struct InactivityTimer<C: Clock> {
    owner: String,
    clock: C,
    record: RwLock<LivenessRecord>,
    ping_in_flight: AtomicBool,
}

/// Clears the in-flight flag on every exit path, including cancellation.
struct PingGuard<'a>(&'a AtomicBool);

impl<'a> PingGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for PingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<C: Clock> InactivityTimer<C> {
    /// Start a timer whose last ping is the current time.
    pub fn new(owner: impl Into<String>, clock: C, threshold: InactivityThreshold) -> Self {
        let record = LivenessRecord::new(clock.now(), threshold);
        Self::from_record(owner, clock, record)
    }

    /// Resume a timer from a stored record.
    pub fn from_record(owner: impl Into<String>, clock: C, record: LivenessRecord) -> Self {
        Self {
            owner: owner.into(),
            clock,
            record: RwLock::new(record),
            ping_in_flight: AtomicBool::new(false),
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    fn read(&self) -> RwLockReadGuard<'_, LivenessRecord> {
        self.record.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, LivenessRecord> {
        self.record.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Prove liveness and reset the countdown.
    ///
    /// Only one ping may be verified at a time; a second concurrent call
    /// fails with [`SwitchError::PingInFlight`]. The record is written only
    /// after verification succeeds, so a failed or dropped ping changes nothing.
    pub async fn ping<P>(&self, prover: &P) -> Result<Timestamp, SwitchError>
    where
        P: ProofService + ?Sized,
    {
        let _guard = PingGuard::acquire(&self.ping_in_flight).ok_or(SwitchError::PingInFlight)?;

        let request = ProofRequest::Liveness {
            owner: self.owner.clone(),
        };
        prover.prove(&request).await?;

        let now = self.clock.now();
        let mut record = self.write();
        record.touch(now);
        log::info!(
            "Proof of life recorded for {} (unlocks at {})",
            self.owner,
            record.unlock_time()
        );
        Ok(record.last_ping)
    }

    pub fn is_ping_in_flight(&self) -> bool {
        self.ping_in_flight.load(Ordering::Acquire)
    }

    /// Time left at the current clock reading.
    pub fn remaining(&self) -> Remaining {
        self.remaining_at(self.clock.now())
    }

    pub fn remaining_at(&self, now: Timestamp) -> Remaining {
        self.read().remaining(now)
    }

    pub fn is_fired(&self) -> bool {
        self.read().is_fired(self.clock.now())
    }

    /// Change the threshold. Takes effect immediately against the existing
    /// last ping; no fresh ping is needed.
    pub fn update_threshold(&self, days: u16) -> Result<InactivityThreshold, SwitchError> {
        let threshold = InactivityThreshold::from_days(days)?;
        let mut record = self.write();
        record.threshold = threshold;
        log::info!("Inactivity threshold for {} set to {}", self.owner, threshold);
        Ok(threshold)
    }

    /// Copy of the current record.
    pub fn snapshot(&self) -> LivenessRecord {
        *self.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{days, start_clock};
    use ghostvault_core::mock::MockProver;
    use ghostvault_core::ServiceError;
    use std::time::Duration;

    #[test]
    fn test_remaining_decomposition() {
        let ms = 2 * MS_PER_DAY + 3 * MS_PER_HOUR + 4 * MS_PER_MINUTE + 5 * MS_PER_SECOND + 999;
        let r = Remaining::from_millis(ms);
        assert_eq!((r.days, r.hours, r.minutes, r.seconds), (2, 3, 4, 5));
        assert_eq!(r.to_string(), "2d 3h 4m 5s");
    }

    #[test]
    fn test_remaining_zero_exactly_at_unlock() {
        for d in [30u16, 60, 180, 365] {
            let threshold = InactivityThreshold::from_days(d).unwrap();
            let record = LivenessRecord::new(Timestamp::from_millis(1_000), threshold);
            let unlock = record.unlock_time();

            let just_before = Timestamp::from_millis(unlock.as_millis() - 1);
            assert!(record.remaining(just_before).total_ms > 0);
            assert!(!record.is_fired(just_before));

            assert!(record.remaining(unlock).is_zero());
            assert!(record.is_fired(unlock));

            let later = Timestamp::from_millis(unlock.as_millis() + MS_PER_DAY);
            assert!(record.remaining(later).is_zero());
            assert!(record.is_fired(later));
        }
    }

    #[test]
    fn test_touch_is_monotonic() {
        let mut record = LivenessRecord::new(days(10), InactivityThreshold::default());
        record.touch(days(5));
        assert_eq!(record.last_ping, days(10));
        record.touch(days(12));
        assert_eq!(record.last_ping, days(12));
    }

    #[tokio::test]
    async fn test_ping_resets_to_full_threshold() {
        let clock = start_clock();
        let timer = InactivityTimer::new("owner", clock.clone(), InactivityThreshold::six_months());
        clock.advance_days(100);
        assert_eq!(timer.remaining().days, 80);

        timer.ping(&MockProver::new()).await.unwrap();
        assert_eq!(timer.remaining().total_ms, 180 * MS_PER_DAY);
    }

    #[tokio::test]
    async fn test_failed_ping_leaves_record_unchanged() {
        let clock = start_clock();
        let timer = InactivityTimer::new("owner", clock.clone(), InactivityThreshold::one_month());
        let before = timer.snapshot();
        clock.advance_days(3);

        let prover = MockProver::new();
        prover.set_failure(Some(ServiceError::ProofGeneration("no witness".into())));
        let result = timer.ping(&prover).await;

        assert!(matches!(result, Err(SwitchError::Service(_))));
        assert_eq!(timer.snapshot(), before);
        assert!(!timer.is_ping_in_flight());
    }

    #[tokio::test]
    async fn test_concurrent_ping_rejected() {
        let clock = start_clock();
        let timer = InactivityTimer::new("owner", clock.clone(), InactivityThreshold::default());
        let prover = MockProver::new().with_delay(Duration::from_millis(50));

        let (first, second) = tokio::join!(timer.ping(&prover), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            timer.ping(&prover).await
        });

        assert!(first.is_ok());
        assert_eq!(second, Err(SwitchError::PingInFlight));
        // Flag cleared once the first ping lands
        assert!(timer.ping(&prover).await.is_ok());
    }

    #[tokio::test]
    async fn test_cancelled_ping_commits_nothing() {
        let clock = start_clock();
        let timer = InactivityTimer::new("owner", clock.clone(), InactivityThreshold::default());
        let before = timer.snapshot();
        clock.advance_days(1);

        let prover = MockProver::new().with_delay(Duration::from_secs(10));
        let outcome = tokio::time::timeout(Duration::from_millis(20), timer.ping(&prover)).await;

        assert!(outcome.is_err(), "ping should have been abandoned");
        assert_eq!(timer.snapshot(), before);
        assert!(!timer.is_ping_in_flight());
    }

    #[test]
    fn test_update_threshold_uses_existing_ping() {
        let clock = start_clock();
        let timer = InactivityTimer::new("owner", clock.clone(), InactivityThreshold::six_months());
        clock.advance_days(50);

        timer.update_threshold(60).unwrap();
        assert_eq!(timer.remaining().days, 10);
        assert!(!timer.is_fired());

        timer.update_threshold(30).unwrap();
        assert!(timer.is_fired());

        timer.update_threshold(365).unwrap();
        assert_eq!(timer.remaining().days, 315);
    }

    #[test]
    fn test_update_threshold_rejects_out_of_range() {
        let timer = InactivityTimer::new("owner", start_clock(), InactivityThreshold::six_months());
        assert!(matches!(timer.update_threshold(20), Err(SwitchError::Validation(_))));
        assert!(matches!(timer.update_threshold(400), Err(SwitchError::Validation(_))));
        assert_eq!(timer.snapshot().threshold.days(), 180);

        for ok in [30, 180, 365] {
            assert_eq!(timer.update_threshold(ok).unwrap().days(), ok);
        }
    }

    #[test]
    fn test_record_serde_roundtrip() {
        let record = LivenessRecord::new(days(3), InactivityThreshold::from_days(90).unwrap());
        let json = serde_json::to_string(&record).unwrap();
        let restored: LivenessRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(record, restored);
    }
}
