//! Persistent vault state
//!
//! The liveness record plus the latched firing observation, stored as JSON
//! in the data directory.

use ghostvault_core::Timestamp;
use ghostvault_switch::{InactivityThreshold, LivenessRecord};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

/// Errors from state operations
#[derive(Error, Debug)]
pub enum StateError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaultState {
    pub record: LivenessRecord,

    /// First check cycle that saw the switch fired
    #[serde(default)]
    pub fired_at: Option<Timestamp>,

    /// Whether the heir has been told the vault is claimable
    #[serde(default)]
    pub heir_notified: bool,

    /// Last completed check cycle
    #[serde(default)]
    pub last_check: Option<Timestamp>,
}

impl VaultState {
    /// Fresh state whose countdown starts at `now`.
    pub fn new(now: Timestamp, threshold: InactivityThreshold) -> Self {
        Self {
            record: LivenessRecord::new(now, threshold),
            fired_at: None,
            heir_notified: false,
            last_check: None,
        }
    }

    /// Load state from file, or start a new countdown if none exists.
    pub fn load_or_init(
        path: &Path,
        now: Timestamp,
        threshold: InactivityThreshold,
    ) -> Result<Self, StateError> {
        if path.exists() {
            let contents = fs::read_to_string(path)?;
            let state: VaultState = serde_json::from_str(&contents)?;
            Ok(state)
        } else {
            log::info!("No state at {}, starting countdown now", path.display());
            Ok(Self::new(now, threshold))
        }
    }

    /// Save state to file.
    ///
    /// Writes a sibling temp file and renames it over `path`, so a concurrent
    /// reader sees either the old or the new state.
    pub fn save(&self, path: &Path) -> Result<(), StateError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Save, first folding in whatever another writer stored since this
    /// state was loaded. An acknowledged ping is never overwritten.
    pub fn save_merged(&mut self, path: &Path) -> Result<(), StateError> {
        if path.exists() {
            let on_disk: VaultState = serde_json::from_str(&fs::read_to_string(path)?)?;
            self.reconcile(on_disk);
        }
        self.save(path)
    }

    /// Merge a state written concurrently by another process.
    ///
    /// A later proof of life always wins, together with the latch it cleared.
    /// Returns true if the other writer's record was adopted.
    pub fn reconcile(&mut self, other: VaultState) -> bool {
        self.last_check = self.last_check.max(other.last_check);
        if other.record.last_ping <= self.record.last_ping {
            return false;
        }
        log::info!(
            "Adopting proof of life at {} recorded while this writer was busy",
            other.record.last_ping
        );
        self.record = other.record;
        self.fired_at = other.fired_at;
        self.heir_notified = other.heir_notified;
        true
    }

    /// Adopt a changed threshold against the existing last ping.
    /// Returns true if it changed.
    pub fn apply_threshold(&mut self, threshold: InactivityThreshold) -> bool {
        if self.record.threshold == threshold {
            return false;
        }
        log::info!(
            "Threshold changed from {} to {}",
            self.record.threshold,
            threshold
        );
        self.record.threshold = threshold;
        true
    }

    /// Latch firing. Returns true only on the first observation.
    pub fn observe_fired(&mut self, now: Timestamp) -> bool {
        if self.fired_at.is_some() || !self.record.is_fired(now) {
            return false;
        }
        self.fired_at = Some(now);
        true
    }

    /// Adopt a newer liveness record after a ping.
    ///
    /// A ping that lands after the latch re-arms the switch and clears it,
    /// so a later firing is reported again. Returns the cleared latch.
    pub fn record_ping(&mut self, record: LivenessRecord) -> Option<Timestamp> {
        self.record = record;
        let cleared = self.fired_at.take();
        if cleared.is_some() {
            self.heir_notified = false;
        }
        cleared
    }
}
