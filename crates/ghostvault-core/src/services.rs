//! External collaborators
//!
//! The vault depends on, but does not implement, a proof generator, a
//! relayer, a ledger scanner and a key registry. These traits are the seams;
//! tests plug in [`crate::mock`], production plugs in real backends.

use crate::address::Asset;
use crate::clock::{Clock, SystemClock, Timestamp};
use crate::crypto::SealedPackage;
use crate::note::{Commitment, Nullifier};
use async_trait::async_trait;
use rand::RngCore;
use secp256k1::PublicKey;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;

/// Errors reported by external collaborators.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("Proof generation failed: {0}")]
    ProofGeneration(String),

    #[error("Submission failed: {0}")]
    Submission(String),

    #[error("Ledger scan failed: {0}")]
    Scanner(String),

    #[error("Key registration failed: {0}")]
    Registry(String),
}

impl ServiceError {
    /// Transient failures worth retrying with backoff.
    ///
    /// Proof generation is deterministic in its inputs, so retrying it
    /// unchanged will fail again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ServiceError::Submission(_) | ServiceError::Scanner(_))
    }
}

/// A statement the prover is asked to back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProofRequest {
    /// Proof of life from the vault owner.
    Liveness { owner: String },
    /// Knowledge of the note behind a fresh commitment.
    Deposit {
        commitment: Commitment,
        asset: Asset,
        amount: u64,
    },
    /// Ownership of an unspent commitment, bound to a recipient.
    Withdrawal {
        nullifier: Nullifier,
        commitment: Commitment,
        recipient: String,
    },
    /// Heir's claim on a matured vault.
    Claim {
        nullifier: Nullifier,
        destination: String,
    },
}

impl ProofRequest {
    pub fn kind(&self) -> &'static str {
        match self {
            ProofRequest::Liveness { .. } => "liveness",
            ProofRequest::Deposit { .. } => "deposit",
            ProofRequest::Withdrawal { .. } => "withdrawal",
            ProofRequest::Claim { .. } => "claim",
        }
    }
}

/// Opaque proof produced by a [`ProofService`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofArtifact {
    pub kind: String,
    pub bytes: Vec<u8>,
}

/// Opaque identifier of a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionReference(String);

impl TransactionReference {
    /// Wrap a reference returned by a relayer. Empty references are rejected.
    pub fn new(reference: impl Into<String>) -> Option<Self> {
        let reference = reference.into();
        if reference.trim().is_empty() {
            None
        } else {
            Some(Self(reference))
        }
    }

    /// A random `0x`-prefixed 32-byte hash.
    pub fn random() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(format!("0x{}", hex::encode(bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What the ledger knows about a beneficiary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanResult {
    /// A matured vault exists; here is its sealed credential.
    Found(SealedPackage),
    NotFound,
}

#[async_trait]
pub trait ProofService: Send + Sync {
    async fn prove(&self, request: &ProofRequest) -> Result<ProofArtifact, ServiceError>;
}

#[async_trait]
pub trait Relayer: Send + Sync {
    async fn submit(
        &self,
        proof: &ProofArtifact,
        destination: &str,
    ) -> Result<TransactionReference, ServiceError>;
}

#[async_trait]
pub trait LedgerScanner: Send + Sync {
    async fn scan(&self, beneficiary: &str) -> Result<ScanResult, ServiceError>;
}

#[async_trait]
pub trait KeyRegistry: Send + Sync {
    async fn register(&self, beneficiary: &str, key: &PublicKey) -> Result<(), ServiceError>;
}

/// Local liveness attestation.
///
/// Answers only [`ProofRequest::Liveness`], with a SHA-256 digest over the
/// owner and the attestation time. Used where the operator console itself
/// is the trusted witness of a check-in.
pub struct LocalAttestor<C: Clock = SystemClock> {
    clock: C,
}

impl LocalAttestor<SystemClock> {
    pub fn new() -> Self {
        Self { clock: SystemClock }
    }
}

impl Default for LocalAttestor<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> LocalAttestor<C> {
    pub fn with_clock(clock: C) -> Self {
        Self { clock }
    }

    fn attest(owner: &str, at: Timestamp) -> Vec<u8> {
        let mut hasher = Sha256::new();
        hasher.update(b"ghostvault/liveness");
        hasher.update(owner.as_bytes());
        hasher.update(at.as_millis().to_be_bytes());
        hasher.finalize().to_vec()
    }
}

#[async_trait]
impl<C: Clock> ProofService for LocalAttestor<C> {
    async fn prove(&self, request: &ProofRequest) -> Result<ProofArtifact, ServiceError> {
        match request {
            ProofRequest::Liveness { owner } => {
                let bytes = Self::attest(owner, self.clock.now());
                log::debug!("Attested liveness for {}", owner);
                Ok(ProofArtifact {
                    kind: request.kind().to_string(),
                    bytes,
                })
            }
            other => Err(ServiceError::ProofGeneration(format!(
                "local attestor cannot prove {} statements",
                other.kind()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    #[test]
    fn test_retryable_classification() {
        assert!(ServiceError::Submission("gas".into()).is_retryable());
        assert!(ServiceError::Scanner("timeout".into()).is_retryable());
        assert!(!ServiceError::ProofGeneration("bad witness".into()).is_retryable());
        assert!(!ServiceError::Registry("rejected".into()).is_retryable());
    }

    #[test]
    fn test_transaction_reference() {
        assert!(TransactionReference::new("").is_none());
        assert!(TransactionReference::new("   ").is_none());
        assert_eq!(TransactionReference::new("0xabc").unwrap().as_str(), "0xabc");

        let random = TransactionReference::random();
        assert!(random.as_str().starts_with("0x"));
        assert_eq!(random.as_str().len(), 66);
    }

    #[tokio::test]
    async fn test_local_attestor_liveness() {
        let clock = ManualClock::new(Timestamp::from_millis(42));
        let attestor = LocalAttestor::with_clock(clock.clone());

        let request = ProofRequest::Liveness {
            owner: "owner".into(),
        };
        let first = attestor.prove(&request).await.unwrap();
        assert_eq!(first.kind, "liveness");
        assert_eq!(first.bytes.len(), 32);

        clock.advance_days(1);
        let second = attestor.prove(&request).await.unwrap();
        assert_ne!(first.bytes, second.bytes);
    }

    #[tokio::test]
    async fn test_local_attestor_rejects_other_requests() {
        let attestor = LocalAttestor::new();
        let request = ProofRequest::Claim {
            nullifier: Nullifier::from_bytes([1; 32]),
            destination: "0xFRESH".into(),
        };
        assert!(matches!(
            attestor.prove(&request).await,
            Err(ServiceError::ProofGeneration(_))
        ));
    }
}
