//! GhostVault Pool
//!
//! Shielded deposits and single-spend withdrawals.
//!
//! A deposit hands back a [`VaultNote`] exactly once. The pool keeps only the
//! note's commitment, so a lost note cannot be reconstructed. A withdrawal
//! presents the note, proves ownership of its commitment, and marks it spent
//! atomically with the relayer accepting the transaction.
//!
//! ```text
//! deposit(100, "USDC") ──> note ──> withdraw(note, 0x…) ──> spent
//!                                   withdraw(note, 0x…) ──> InvalidNote
//! ```

mod ledger;

use ghostvault_core::{
    Address, Asset, Commitment, ProofRequest, ProofService, Relayer, ServiceError,
    TransactionReference, VaultNote,
};
use thiserror::Error;

use crate::ledger::Ledger;

/// Destination the relayer is given for deposits into the pool.
pub const POOL_DESTINATION: &str = "ghostvault:shielded-pool";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid note: {0}")]
    InvalidNote(String),

    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),

    #[error("Proof generation failed: {0}")]
    ProofGeneration(String),

    #[error("Submission failed: {0}")]
    Submission(String),
}

impl PoolError {
    /// Only relayer failures are worth retrying unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PoolError::Submission(_))
    }
}

impl From<ServiceError> for PoolError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::ProofGeneration(msg) => PoolError::ProofGeneration(msg),
            ServiceError::Submission(msg) => PoolError::Submission(msg),
            other => PoolError::Submission(other.to_string()),
        }
    }
}

/// What a deposit returns. The note inside is shown to the depositor once.
#[derive(Debug)]
pub struct DepositReceipt {
    pub note: VaultNote,
    pub commitment: Commitment,
    pub transaction: TransactionReference,
}

/// A shielded pool backed by a prover and a relayer.
pub struct ShieldedPool<P, R> {
    prover: P,
    relayer: R,
    ledger: Ledger,
}

impl<P: ProofService, R: Relayer> ShieldedPool<P, R> {
    pub fn new(prover: P, relayer: R) -> Self {
        Self {
            prover,
            relayer,
            ledger: Ledger::default(),
        }
    }

    pub fn prover(&self) -> &P {
        &self.prover
    }

    pub fn relayer(&self) -> &R {
        &self.relayer
    }

    /// Shield `amount` of `asset`.
    ///
    /// Input is validated before any collaborator is called. The commitment
    /// is recorded only after the relayer accepts, so a failed or dropped
    /// deposit leaves no trace.
    pub async fn deposit(&self, amount: u64, asset: &str) -> Result<DepositReceipt, PoolError> {
        if amount == 0 {
            return Err(PoolError::Validation("amount must be positive".into()));
        }
        let asset = asset
            .parse::<Asset>()
            .map_err(|e| PoolError::Validation(e.to_string()))?;
        if self.ledger.balance(asset).checked_add(amount).is_none() {
            return Err(PoolError::Validation(format!(
                "deposit would overflow the {} pool",
                asset
            )));
        }

        let note = VaultNote::generate(asset, amount);
        let commitment = note.commitment();

        let request = ProofRequest::Deposit {
            commitment,
            asset,
            amount,
        };
        let proof = self.prover.prove(&request).await?;
        let transaction = self.relayer.submit(&proof, POOL_DESTINATION).await?;

        if !self.ledger.issue(commitment, asset, amount) {
            return Err(PoolError::Validation(format!(
                "commitment {} already issued",
                commitment
            )));
        }

        log::info!(
            "Deposited {} {} as {:?} in {}",
            amount,
            asset,
            commitment,
            transaction
        );
        Ok(DepositReceipt {
            note,
            commitment,
            transaction,
        })
    }

    /// Spend `note` to `recipient`.
    ///
    /// Withdrawals of one note run one at a time: the first to finish marks
    /// it spent and every later attempt fails with [`PoolError::InvalidNote`].
    /// A failed or dropped withdrawal leaves the note unspent.
    pub async fn withdraw(
        &self,
        note: &str,
        recipient: &str,
    ) -> Result<TransactionReference, PoolError> {
        let note = VaultNote::parse(note).map_err(|e| PoolError::InvalidNote(e.to_string()))?;
        let recipient =
            Address::parse(recipient).map_err(|e| PoolError::InvalidRecipient(e.to_string()))?;
        let commitment = note.commitment();

        let lock = self
            .ledger
            .lock_for(&commitment)
            .ok_or_else(|| PoolError::InvalidNote("note was never issued".into()))?;
        let _held = lock.lock().await;

        if self.ledger.is_spent(&commitment) {
            log::warn!("Rejected withdrawal of spent note {:?}", commitment);
            return Err(PoolError::InvalidNote("note already spent".into()));
        }

        let request = ProofRequest::Withdrawal {
            nullifier: note.nullifier(),
            commitment,
            recipient: recipient.to_string(),
        };
        let proof = self.prover.prove(&request).await?;
        let transaction = self.relayer.submit(&proof, recipient.as_str()).await?;

        self.ledger.mark_spent(commitment);
        log::info!(
            "Withdrew {} {} to {} in {}",
            note.amount(),
            note.asset(),
            recipient,
            transaction
        );
        Ok(transaction)
    }

    pub fn is_spent(&self, commitment: &Commitment) -> bool {
        self.ledger.is_spent(commitment)
    }

    /// Total unspent value held in `asset`.
    pub fn pool_balance(&self, asset: Asset) -> u64 {
        self.ledger.balance(asset)
    }

    /// Number of notes ever issued (the anonymity set size).
    pub fn anonymity_set(&self) -> usize {
        self.ledger.issued_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ghostvault_core::mock::{MockProver, MockRelayer};

    fn pool() -> ShieldedPool<MockProver, MockRelayer> {
        ShieldedPool::new(MockProver::new(), MockRelayer::new())
    }

    #[tokio::test]
    async fn test_deposit_validates_before_side_effects() {
        let pool = pool();

        let err = pool.deposit(0, "USDC").await.unwrap_err();
        assert!(matches!(err, PoolError::Validation(_)));

        let err = pool.deposit(10, "DOGE").await.unwrap_err();
        assert!(matches!(err, PoolError::Validation(_)));

        assert_eq!(pool.prover().calls(), 0);
        assert_eq!(pool.anonymity_set(), 0);
    }

    #[tokio::test]
    async fn test_deposit_issues_note() {
        let pool = pool();

        let receipt = pool.deposit(100, "usdc").await.unwrap();

        assert_eq!(receipt.note.asset(), Asset::Usdc);
        assert_eq!(receipt.note.amount(), 100);
        assert_eq!(receipt.commitment, receipt.note.commitment());
        assert!(receipt.note.encode().starts_with("ghost-usdc-100-"));
        assert_eq!(pool.pool_balance(Asset::Usdc), 100);
        assert_eq!(pool.pool_balance(Asset::Usdt), 0);
        assert_eq!(pool.relayer().destinations(), vec![POOL_DESTINATION.to_string()]);
    }

    #[tokio::test]
    async fn test_deposit_rejects_pool_overflow() {
        let pool = pool();
        pool.deposit(u64::MAX, "USDC").await.unwrap();
        let calls = pool.prover().calls();

        let err = pool.deposit(1, "USDC").await.unwrap_err();
        assert!(matches!(err, PoolError::Validation(_)));
        assert_eq!(pool.prover().calls(), calls);

        assert_eq!(pool.pool_balance(Asset::Usdc), u64::MAX);
        pool.deposit(1, "USDT").await.unwrap();
        assert_eq!(pool.anonymity_set(), 2);
    }

    #[tokio::test]
    async fn test_failed_deposit_records_nothing() {
        let pool = pool();
        pool.relayer()
            .set_failure(Some(ServiceError::Submission("nonce too low".into())));

        let err = pool.deposit(50, "USDT").await.unwrap_err();

        assert!(err.is_retryable());
        assert_eq!(pool.anonymity_set(), 0);
        assert_eq!(pool.pool_balance(Asset::Usdt), 0);
    }

    #[tokio::test]
    async fn test_withdraw_rejects_bad_input() {
        let pool = pool();
        let receipt = pool.deposit(100, "USDC").await.unwrap();
        let note = receipt.note.encode();

        let err = pool
            .withdraw("ghost-zk-snark-xyz", "0x0000000000000000000000000000000000000001")
            .await;
        assert!(matches!(err, Err(PoolError::InvalidNote(_))));

        let err = pool.withdraw(&note, "0xFRESH").await;
        assert!(matches!(err, Err(PoolError::InvalidRecipient(_))));

        // Well formed but never deposited here
        let foreign = VaultNote::generate(Asset::Usdc, 100).encode();
        let err = pool
            .withdraw(&foreign, "0x0000000000000000000000000000000000000001")
            .await;
        assert!(matches!(err, Err(PoolError::InvalidNote(_))));

        assert!(!pool.is_spent(&receipt.commitment));
    }

    #[test]
    fn test_error_classification() {
        assert!(PoolError::Submission("x".into()).is_retryable());
        assert!(!PoolError::ProofGeneration("x".into()).is_retryable());
        assert!(!PoolError::InvalidNote("x".into()).is_retryable());

        assert_eq!(
            PoolError::from(ServiceError::ProofGeneration("bad witness".into())),
            PoolError::ProofGeneration("bad witness".into())
        );
    }
}
