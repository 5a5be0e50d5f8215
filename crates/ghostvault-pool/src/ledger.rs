//! Commitment ledger
//!
//! Records which commitments were issued and which are spent. Each issued
//! commitment carries its own async lock; a withdrawal holds it from the
//! spent check until the spent mark, across proof generation and relaying.

use ghostvault_core::{Asset, Commitment};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Serializes withdrawals of one note.
pub(crate) type NoteLock = Arc<tokio::sync::Mutex<()>>;

#[derive(Debug)]
struct Entry {
    asset: Asset,
    amount: u64,
    lock: NoteLock,
}

#[derive(Debug, Default)]
struct Inner {
    notes: HashMap<Commitment, Entry>,
    spent: HashSet<Commitment>,
}

#[derive(Debug, Default)]
pub(crate) struct Ledger {
    inner: Mutex<Inner>,
}

impl Ledger {
    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a confirmed deposit. Returns false if the commitment exists.
    pub(crate) fn issue(&self, commitment: Commitment, asset: Asset, amount: u64) -> bool {
        let mut inner = self.inner();
        if inner.notes.contains_key(&commitment) {
            return false;
        }
        inner.notes.insert(
            commitment,
            Entry {
                asset,
                amount,
                lock: NoteLock::default(),
            },
        );
        true
    }

    /// The withdrawal lock for an issued commitment.
    pub(crate) fn lock_for(&self, commitment: &Commitment) -> Option<NoteLock> {
        self.inner()
            .notes
            .get(commitment)
            .map(|entry| Arc::clone(&entry.lock))
    }

    pub(crate) fn is_spent(&self, commitment: &Commitment) -> bool {
        self.inner().spent.contains(commitment)
    }

    /// Mark a commitment spent. Returns false if it already was.
    pub(crate) fn mark_spent(&self, commitment: Commitment) -> bool {
        self.inner().spent.insert(commitment)
    }

    /// Sum of unspent deposits in `asset`.
    pub(crate) fn balance(&self, asset: Asset) -> u64 {
        let inner = self.inner();
        inner
            .notes
            .iter()
            .filter(|(c, e)| e.asset == asset && !inner.spent.contains(*c))
            .map(|(_, e)| e.amount)
            .fold(0u64, u64::saturating_add)
    }

    pub(crate) fn issued_count(&self) -> usize {
        self.inner().notes.len()
    }
}
