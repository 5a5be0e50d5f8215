//! In-memory collaborators for tests.
//!
//! Every mock can be given an artificial delay (to exercise suspension and
//! cancellation) and an injected failure.

use crate::crypto::SealedPackage;
use crate::services::{
    KeyRegistry, LedgerScanner, ProofArtifact, ProofRequest, ProofService, Relayer, ScanResult,
    ServiceError, TransactionReference,
};
use async_trait::async_trait;
use secp256k1::PublicKey;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn pause(delay: Option<Duration>) {
    if let Some(d) = delay {
        tokio::time::sleep(d).await;
    }
}

/// Prover that hashes the request into a fake proof.
#[derive(Debug, Default)]
pub struct MockProver {
    delay: Option<Duration>,
    failure: Mutex<Option<ServiceError>>,
    calls: AtomicUsize,
}

impl MockProver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail every call with `error` until cleared with `None`.
    pub fn set_failure(&self, error: Option<ServiceError>) {
        *lock(&self.failure) = error;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProofService for MockProver {
    async fn prove(&self, request: &ProofRequest) -> Result<ProofArtifact, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        pause(self.delay).await;

        if let Some(err) = lock(&self.failure).clone() {
            return Err(err);
        }

        let encoded = format!("{:?}", request);
        Ok(ProofArtifact {
            kind: request.kind().to_string(),
            bytes: Sha256::digest(encoded.as_bytes()).to_vec(),
        })
    }
}

/// Relayer that returns random transaction hashes.
#[derive(Debug, Default)]
pub struct MockRelayer {
    delay: Option<Duration>,
    failure: Mutex<Option<ServiceError>>,
    submissions: Mutex<Vec<(String, TransactionReference)>>,
}

impl MockRelayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn set_failure(&self, error: Option<ServiceError>) {
        *lock(&self.failure) = error;
    }

    /// Number of successful submissions.
    pub fn submission_count(&self) -> usize {
        lock(&self.submissions).len()
    }

    /// Destinations of successful submissions, in order.
    pub fn destinations(&self) -> Vec<String> {
        lock(&self.submissions)
            .iter()
            .map(|(d, _)| d.clone())
            .collect()
    }
}

#[async_trait]
impl Relayer for MockRelayer {
    async fn submit(
        &self,
        proof: &ProofArtifact,
        destination: &str,
    ) -> Result<TransactionReference, ServiceError> {
        pause(self.delay).await;

        if let Some(err) = lock(&self.failure).clone() {
            return Err(err);
        }
        if proof.bytes.is_empty() {
            return Err(ServiceError::Submission("empty proof".into()));
        }

        let tx = TransactionReference::random();
        lock(&self.submissions).push((destination.to_string(), tx.clone()));
        Ok(tx)
    }
}

/// Key registry backed by a map.
#[derive(Debug, Default)]
pub struct InMemoryKeyRegistry {
    keys: Mutex<HashMap<String, PublicKey>>,
    failure: Mutex<Option<ServiceError>>,
}

impl InMemoryKeyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failure(&self, error: Option<ServiceError>) {
        *lock(&self.failure) = error;
    }

    pub fn get(&self, beneficiary: &str) -> Option<PublicKey> {
        lock(&self.keys).get(beneficiary).copied()
    }
}

#[async_trait]
impl KeyRegistry for InMemoryKeyRegistry {
    async fn register(&self, beneficiary: &str, key: &PublicKey) -> Result<(), ServiceError> {
        if let Some(err) = lock(&self.failure).clone() {
            return Err(err);
        }
        lock(&self.keys).insert(beneficiary.to_string(), *key);
        Ok(())
    }
}

/// Scanner with a fixed set of matured vaults.
#[derive(Debug, Default)]
pub struct StaticScanner {
    delay: Option<Duration>,
    vaults: Mutex<HashMap<String, SealedPackage>>,
}

impl StaticScanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn insert(&self, beneficiary: impl Into<String>, package: SealedPackage) {
        lock(&self.vaults).insert(beneficiary.into(), package);
    }
}

#[async_trait]
impl LedgerScanner for StaticScanner {
    async fn scan(&self, beneficiary: &str) -> Result<ScanResult, ServiceError> {
        pause(self.delay).await;
        Ok(match lock(&self.vaults).get(beneficiary) {
            Some(package) => ScanResult::Found(package.clone()),
            None => ScanResult::NotFound,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::BeneficiaryKeypair;

    fn liveness() -> ProofRequest {
        ProofRequest::Liveness {
            owner: "owner".into(),
        }
    }

    #[tokio::test]
    async fn test_prover_counts_and_fails() {
        let prover = MockProver::new();
        assert!(prover.prove(&liveness()).await.is_ok());

        prover.set_failure(Some(ServiceError::ProofGeneration("boom".into())));
        assert!(prover.prove(&liveness()).await.is_err());
        assert_eq!(prover.calls(), 2);

        prover.set_failure(None);
        assert!(prover.prove(&liveness()).await.is_ok());
    }

    #[tokio::test]
    async fn test_relayer_records_successes_only() {
        let prover = MockProver::new();
        let relayer = MockRelayer::new();
        let proof = prover.prove(&liveness()).await.unwrap();

        relayer.submit(&proof, "0xA").await.unwrap();
        relayer.set_failure(Some(ServiceError::Submission("out of gas".into())));
        assert!(relayer.submit(&proof, "0xB").await.is_err());

        assert_eq!(relayer.submission_count(), 1);
        assert_eq!(relayer.destinations(), vec!["0xA".to_string()]);
    }

    #[tokio::test]
    async fn test_scanner_and_registry() {
        let heir = BeneficiaryKeypair::generate();
        let scanner = StaticScanner::new();
        let package = SealedPackage::seal(&heir.public_key(), b"note").unwrap();
        scanner.insert("heir", package.clone());

        assert_eq!(scanner.scan("heir").await.unwrap(), ScanResult::Found(package));
        assert_eq!(scanner.scan("nobody").await.unwrap(), ScanResult::NotFound);

        let registry = InMemoryKeyRegistry::new();
        registry.register("heir", &heir.public_key()).await.unwrap();
        assert_eq!(registry.get("heir"), Some(heir.public_key()));
    }
}
