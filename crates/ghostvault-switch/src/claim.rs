//! Heir claim workflow
//!
//! ```text
//! Scanning ──scan──> Locked ──decrypt──> Decrypted ──claim──> Success
//!     └──scan──> NotFound
//! ```
//!
//! Every transition takes `&mut self`, so one session can never run two
//! claims at once. Transitions commit only after their awaits complete: a
//! failed or dropped `scan` or `claim` leaves the session where it was.

use ghostvault_core::{
    LedgerScanner, NoteError, ProofRequest, ProofService, Relayer, ScanResult, SealedPackage,
    ServiceError, TransactionReference, VaultNote,
};
use secp256k1::SecretKey;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Where a claim session stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClaimState {
    Scanning,
    /// Terminal: nothing matured for this beneficiary.
    NotFound,
    /// A sealed package was found.
    Locked,
    Decrypted,
    /// Terminal: funds transferred.
    Success,
}

impl fmt::Display for ClaimState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ClaimState::Scanning => "scanning",
            ClaimState::NotFound => "not found",
            ClaimState::Locked => "locked",
            ClaimState::Decrypted => "decrypted",
            ClaimState::Success => "success",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClaimError {
    #[error("Nothing to decrypt (session is {0})")]
    NotReady(ClaimState),

    #[error("Cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: ClaimState,
    },

    #[error("Destination address is required")]
    MissingDestination,

    #[error("No claimable vault found for this beneficiary")]
    NotFound,

    #[error("Package could not be decrypted with this key")]
    Decryption,

    #[error("Decrypted package is not a valid note: {0}")]
    CorruptPackage(#[from] NoteError),

    #[error(transparent)]
    Service(#[from] ServiceError),
}

enum Stage {
    Scanning,
    NotFound,
    Locked(SealedPackage),
    Decrypted(VaultNote),
    Success {
        destination: String,
        transaction: TransactionReference,
    },
}

/// One beneficiary's attempt to claim a matured vault.
pub struct ClaimSession {
    beneficiary: String,
    stage: Stage,
}

impl ClaimSession {
    pub fn new(beneficiary: impl Into<String>) -> Self {
        Self {
            beneficiary: beneficiary.into(),
            stage: Stage::Scanning,
        }
    }

    pub fn beneficiary(&self) -> &str {
        &self.beneficiary
    }

    pub fn state(&self) -> ClaimState {
        match self.stage {
            Stage::Scanning => ClaimState::Scanning,
            Stage::NotFound => ClaimState::NotFound,
            Stage::Locked(_) => ClaimState::Locked,
            Stage::Decrypted(_) => ClaimState::Decrypted,
            Stage::Success { .. } => ClaimState::Success,
        }
    }

    /// The decrypted note, once available.
    pub fn note(&self) -> Option<&VaultNote> {
        match &self.stage {
            Stage::Decrypted(note) => Some(note),
            _ => None,
        }
    }

    pub fn transaction(&self) -> Option<&TransactionReference> {
        match &self.stage {
            Stage::Success { transaction, .. } => Some(transaction),
            _ => None,
        }
    }

    pub fn destination(&self) -> Option<&str> {
        match &self.stage {
            Stage::Success { destination, .. } => Some(destination),
            _ => None,
        }
    }

    /// Ask the ledger whether a matured vault exists for this beneficiary.
    ///
    /// `Found` moves to [`ClaimState::Locked`]. `NotFound` is terminal and
    /// reported as [`ClaimError::NotFound`]. A scanner error leaves the
    /// session scanning so the caller may retry.
    pub async fn scan<S>(&mut self, scanner: &S) -> Result<ClaimState, ClaimError>
    where
        S: LedgerScanner + ?Sized,
    {
        self.require_state(ClaimState::Scanning, "scan")?;

        match scanner.scan(&self.beneficiary).await? {
            ScanResult::Found(package) => {
                log::info!("Sealed package found for {}", self.beneficiary);
                self.stage = Stage::Locked(package);
                Ok(ClaimState::Locked)
            }
            ScanResult::NotFound => {
                log::info!("No claimable vault for {}", self.beneficiary);
                self.stage = Stage::NotFound;
                Err(ClaimError::NotFound)
            }
        }
    }

    /// Open the sealed package with the beneficiary's secret key.
    pub fn decrypt(&mut self, secret_key: &SecretKey) -> Result<ClaimState, ClaimError> {
        let Stage::Locked(package) = &self.stage else {
            return Err(ClaimError::NotReady(self.state()));
        };

        let plaintext = package.open(secret_key).map_err(|_| ClaimError::Decryption)?;
        let text = String::from_utf8(plaintext).map_err(|_| NoteError::Malformed)?;
        let note = VaultNote::parse(&text)?;

        log::info!(
            "Package decrypted for {}: {} {}",
            self.beneficiary,
            note.amount(),
            note.asset()
        );
        self.stage = Stage::Decrypted(note);
        Ok(ClaimState::Decrypted)
    }

    /// Transfer the decrypted note's value to `destination`.
    ///
    /// Proof or relayer failures leave the session decrypted; a
    /// [`ServiceError::Submission`] is worth retrying.
    pub async fn claim<P, R>(
        &mut self,
        destination: &str,
        prover: &P,
        relayer: &R,
    ) -> Result<TransactionReference, ClaimError>
    where
        P: ProofService + ?Sized,
        R: Relayer + ?Sized,
    {
        let Stage::Decrypted(note) = &self.stage else {
            return Err(ClaimError::InvalidState {
                operation: "claim",
                state: self.state(),
            });
        };

        let destination = destination.trim();
        if destination.is_empty() {
            return Err(ClaimError::MissingDestination);
        }

        let request = ProofRequest::Claim {
            nullifier: note.nullifier(),
            destination: destination.to_string(),
        };
        let proof = prover.prove(&request).await?;
        let transaction = relayer.submit(&proof, destination).await?;

        log::info!("Claim for {} submitted: {}", self.beneficiary, transaction);
        self.stage = Stage::Success {
            destination: destination.to_string(),
            transaction: transaction.clone(),
        };
        Ok(transaction)
    }

    /// Leave the workflow. Returns the transaction if the claim succeeded.
    pub fn return_to_start(self) -> Option<TransactionReference> {
        match self.stage {
            Stage::Success { transaction, .. } => Some(transaction),
            _ => None,
        }
    }

    fn require_state(&self, state: ClaimState, operation: &'static str) -> Result<(), ClaimError> {
        if self.state() == state {
            Ok(())
        } else {
            Err(ClaimError::InvalidState {
                operation,
                state: self.state(),
            })
        }
    }
}

impl fmt::Debug for ClaimSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClaimSession")
            .field("beneficiary", &self.beneficiary)
            .field("state", &self.state())
            .finish()
    }
}
