//! GhostVault Core
//!
//! Shared primitives for the GhostVault privacy vault.
//!
//! # Contents
//!
//! - **Clock**: injectable time source so timer logic is testable
//! - **Notes**: the opaque secret credential proving ownership of a deposit
//! - **Sealed packages**: access credentials encrypted to a beneficiary key
//! - **Services**: traits for the prover, relayer, ledger scanner and key registry
//!
//! Proof generation, relaying and ledger scanning are external systems. This
//! crate only defines their contracts; `mock` (behind the `test-utils` feature)
//! provides in-memory stand-ins.

pub mod address;
pub mod clock;
pub mod crypto;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
pub mod note;
pub mod services;

pub use address::{Address, AddressError, Asset};
pub use clock::{Clock, ManualClock, SystemClock, Timestamp, MS_PER_DAY};
pub use crypto::{BeneficiaryKeypair, CryptoError, SealedPackage};
pub use note::{Commitment, NoteError, Nullifier, VaultNote};
pub use services::{
    KeyRegistry, LedgerScanner, LocalAttestor, ProofArtifact, ProofRequest, ProofService, Relayer,
    ScanResult, ServiceError, TransactionReference,
};
