//! Beneficiary designation
//!
//! Who inherits, and whether their key has been registered. A designation
//! only counts once the key registry has confirmed the heir's public key.

use ghostvault_core::KeyRegistry;
use secp256k1::PublicKey;
use serde::{Deserialize, Serialize};

use crate::SwitchError;

/// The heir designated for a vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeneficiaryDesignation {
    /// Destination identifier the ledger scanner knows the heir by
    heir_address: String,
    /// Optional notification contact
    #[serde(default, skip_serializing_if = "Option::is_none")]
    heir_email: Option<String>,
    /// Set only after the key registry confirms registration
    designated: bool,
}

impl BeneficiaryDesignation {
    /// Create an undesignated beneficiary.
    pub fn new(heir_address: &str, heir_email: Option<&str>) -> Result<Self, SwitchError> {
        let heir_address = heir_address.trim();
        if heir_address.is_empty() {
            return Err(SwitchError::Validation(
                "heir address must not be empty".into(),
            ));
        }

        let heir_email = match heir_email.map(str::trim).filter(|e| !e.is_empty()) {
            Some(email) if !email.contains('@') => {
                return Err(SwitchError::Validation(format!(
                    "invalid heir email: {}",
                    email
                )))
            }
            other => other.map(str::to_string),
        };

        Ok(Self {
            heir_address: heir_address.to_string(),
            heir_email,
            designated: false,
        })
    }

    pub fn heir_address(&self) -> &str {
        &self.heir_address
    }

    pub fn heir_email(&self) -> Option<&str> {
        self.heir_email.as_deref()
    }

    pub fn is_designated(&self) -> bool {
        self.designated
    }

    /// Register the heir's public key and mark the designation complete.
    ///
    /// A registry failure leaves the designation untouched.
    pub async fn designate<R>(&mut self, registry: &R, key: &PublicKey) -> Result<(), SwitchError>
    where
        R: KeyRegistry + ?Sized,
    {
        registry.register(&self.heir_address, key).await?;
        self.designated = true;
        log::info!("Beneficiary {} designated", self.heir_address);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ghostvault_core::mock::InMemoryKeyRegistry;
    use ghostvault_core::{BeneficiaryKeypair, ServiceError};

    #[test]
    fn test_requires_address() {
        assert!(BeneficiaryDesignation::new("", None).is_err());
        assert!(BeneficiaryDesignation::new("   ", None).is_err());

        let b = BeneficiaryDesignation::new(" 0x71C...9e21 ", None).unwrap();
        assert_eq!(b.heir_address(), "0x71C...9e21");
        assert!(!b.is_designated());
    }

    #[test]
    fn test_email_optional_but_checked() {
        let b = BeneficiaryDesignation::new("heir", Some("")).unwrap();
        assert_eq!(b.heir_email(), None);

        let b = BeneficiaryDesignation::new("heir", Some("heir@example.com")).unwrap();
        assert_eq!(b.heir_email(), Some("heir@example.com"));

        assert!(BeneficiaryDesignation::new("heir", Some("not-an-email")).is_err());
    }

    #[tokio::test]
    async fn test_designate_registers_key() {
        let registry = InMemoryKeyRegistry::new();
        let key = BeneficiaryKeypair::generate().public_key();
        let mut b = BeneficiaryDesignation::new("heir", None).unwrap();

        b.designate(&registry, &key).await.unwrap();

        assert!(b.is_designated());
        assert_eq!(registry.get("heir"), Some(key));
    }

    #[tokio::test]
    async fn test_registry_failure_keeps_undesignated() {
        let registry = InMemoryKeyRegistry::new();
        registry.set_failure(Some(ServiceError::Registry("unreachable".into())));
        let key = BeneficiaryKeypair::generate().public_key();
        let mut b = BeneficiaryDesignation::new("heir", None).unwrap();

        let result = b.designate(&registry, &key).await;

        assert!(matches!(result, Err(SwitchError::Service(ServiceError::Registry(_)))));
        assert!(!b.is_designated());
    }

    #[test]
    fn test_serde_roundtrip() {
        let b = BeneficiaryDesignation::new("heir", Some("heir@example.com")).unwrap();
        let json = serde_json::to_string(&b).unwrap();
        let restored: BeneficiaryDesignation = serde_json::from_str(&json).unwrap();
        assert_eq!(b, restored);
    }
}
