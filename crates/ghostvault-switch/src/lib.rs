//! GhostVault Switch
//!
//! Dead man's switch and heir claim workflow.
//!
//! # Concepts
//!
//! - **Liveness record**: last proof of life plus an inactivity threshold
//! - **Ping**: the owner proves liveness, resetting the countdown
//! - **Firing**: once `now >= last_ping + threshold` the switch has fired
//! - **Claim**: a designated heir scans for the matured vault, decrypts the
//!   sealed note, and transfers the funds to a fresh address
//!
//! ```text
//! owner:  ping ─ ping ─ ping ─────────────── (silence) ──────────┐
//!                                                               fires
//! heir:                                     Scanning → Locked → Decrypted → Success
//! ```

pub mod beneficiary;
pub mod claim;
pub mod heartbeat;
pub mod liveness;
pub mod threshold;
pub mod vault;

#[cfg(test)]
pub(crate) mod test_utils;

pub use beneficiary::BeneficiaryDesignation;
pub use claim::{ClaimError, ClaimSession, ClaimState};
pub use heartbeat::{
    evaluate_batch, evaluate_heartbeat, HeartbeatAction, HeartbeatConfig, HeartbeatStatus,
};
pub use liveness::{InactivityTimer, LivenessRecord, Remaining};
pub use threshold::InactivityThreshold;
pub use vault::{InheritanceVault, VaultDirectory};

use ghostvault_core::ServiceError;
use thiserror::Error;

/// Errors from the switch side (owner operations and heir designation)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SwitchError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("A ping is already being verified")]
    PingInFlight,

    #[error("Beneficiary is not designated")]
    NotDesignated,

    #[error("Switch has not fired yet")]
    NotFired,

    #[error("Failed to seal note for beneficiary: {0}")]
    Sealing(String),

    #[error(transparent)]
    Service(#[from] ServiceError),
}
