//! Inheritance vaults
//!
//! An [`InheritanceVault`] ties together the owner's inactivity timer, the
//! designated heir, and the note sealed to the heir's key. The sealed note is
//! only released once the heir is designated and the switch has fired.
//!
//! [`VaultDirectory`] is the ledger view the heir's claim session scans.

use async_trait::async_trait;
use ghostvault_core::{
    Clock, KeyRegistry, LedgerScanner, ScanResult, SealedPackage, ServiceError, Timestamp,
    VaultNote,
};
use secp256k1::PublicKey;
use std::sync::{Arc, PoisonError, RwLock};

use crate::beneficiary::BeneficiaryDesignation;
use crate::liveness::InactivityTimer;
use crate::SwitchError;

/// One owner's vault with its dead man's switch.
pub struct InheritanceVault<C: Clock> {
    label: String,
    timer: InactivityTimer<C>,
    beneficiary: BeneficiaryDesignation,
    package: Option<SealedPackage>,
}

impl<C: Clock> InheritanceVault<C> {
    pub fn new(
        label: impl Into<String>,
        timer: InactivityTimer<C>,
        beneficiary: BeneficiaryDesignation,
    ) -> Self {
        Self {
            label: label.into(),
            timer,
            beneficiary,
            package: None,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn timer(&self) -> &InactivityTimer<C> {
        &self.timer
    }

    pub fn beneficiary(&self) -> &BeneficiaryDesignation {
        &self.beneficiary
    }

    pub fn is_sealed(&self) -> bool {
        self.package.is_some()
    }

    /// Seal `note` to the heir's key and register that key.
    ///
    /// The package is sealed before anything is registered, and stored only
    /// after the registry confirms. Any failure leaves the vault as it was.
    pub async fn designate<R>(
        &mut self,
        registry: &R,
        heir_key: &PublicKey,
        note: &VaultNote,
    ) -> Result<(), SwitchError>
    where
        R: KeyRegistry + ?Sized,
    {
        let package = SealedPackage::seal(heir_key, note.encode().as_bytes())
            .map_err(|e| SwitchError::Sealing(e.to_string()))?;

        self.beneficiary.designate(registry, heir_key).await?;
        self.package = Some(package);
        log::info!(
            "Vault {} sealed for {}",
            self.label,
            self.beneficiary.heir_address()
        );
        Ok(())
    }

    /// True once the heir is designated and the switch has fired at `now`.
    pub fn claimable(&self, now: Timestamp) -> bool {
        self.beneficiary.is_designated()
            && self.package.is_some()
            && self.timer.snapshot().is_fired(now)
    }

    /// Release the sealed package to `beneficiary` if they may claim at `now`.
    pub fn authorize_at(
        &self,
        beneficiary: &str,
        now: Timestamp,
    ) -> Result<&SealedPackage, SwitchError> {
        let heir = self.beneficiary.heir_address();
        if !beneficiary.trim().eq_ignore_ascii_case(heir) || !self.beneficiary.is_designated() {
            return Err(SwitchError::NotDesignated);
        }
        let package = self.package.as_ref().ok_or(SwitchError::NotDesignated)?;
        if !self.timer.snapshot().is_fired(now) {
            return Err(SwitchError::NotFired);
        }
        Ok(package)
    }

    /// [`authorize_at`](Self::authorize_at) using the timer's clock.
    pub fn authorize(&self, beneficiary: &str) -> Result<&SealedPackage, SwitchError> {
        self.authorize_at(beneficiary, self.timer.now())
    }
}

/// In-process ledger of inheritance vaults.
pub struct VaultDirectory<C: Clock> {
    vaults: RwLock<Vec<Arc<InheritanceVault<C>>>>,
}

impl<C: Clock> Default for VaultDirectory<C> {
    fn default() -> Self {
        Self {
            vaults: RwLock::new(Vec::new()),
        }
    }
}

impl<C: Clock> VaultDirectory<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a vault. The returned handle lets the owner keep pinging it.
    pub fn publish(&self, vault: InheritanceVault<C>) -> Arc<InheritanceVault<C>> {
        let vault = Arc::new(vault);
        self.vaults
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::clone(&vault));
        vault
    }

    pub fn len(&self) -> usize {
        self.vaults.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// First package `beneficiary` is authorized to claim, if any.
    pub fn find_claimable(&self, beneficiary: &str) -> Option<SealedPackage> {
        let vaults = self.vaults.read().unwrap_or_else(PoisonError::into_inner);
        vaults.iter().find_map(|vault| match vault.authorize(beneficiary) {
            Ok(package) => {
                log::info!("Vault {} is claimable by {}", vault.label(), beneficiary);
                Some(package.clone())
            }
            Err(_) => None,
        })
    }
}

#[async_trait]
impl<C: Clock + 'static> LedgerScanner for VaultDirectory<C> {
    async fn scan(&self, beneficiary: &str) -> Result<ScanResult, ServiceError> {
        Ok(match self.find_claimable(beneficiary) {
            Some(package) => ScanResult::Found(package),
            None => ScanResult::NotFound,
        })
    }
}
