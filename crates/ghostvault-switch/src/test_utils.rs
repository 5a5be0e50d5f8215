//! Shared test utilities for ghostvault-switch tests.

use ghostvault_core::{BeneficiaryKeypair, ManualClock, SealedPackage, Timestamp, VaultNote};

/// 2024-01-01T00:00:00Z, an arbitrary fixed origin for manual clocks.
pub const START_MS: u64 = 1_704_067_200_000;

/// A manual clock at [`START_MS`].
pub fn start_clock() -> ManualClock {
    ManualClock::new(Timestamp::from_millis(START_MS))
}

/// `n` whole days after the Unix epoch.
pub fn days(n: u64) -> Timestamp {
    Timestamp::from_days(n)
}

/// A note sealed to a freshly generated heir key.
pub fn sealed_note(note: &VaultNote) -> (BeneficiaryKeypair, SealedPackage) {
    let heir = BeneficiaryKeypair::generate();
    let package = SealedPackage::seal(&heir.public_key(), note.encode().as_bytes()).unwrap();
    (heir, package)
}
