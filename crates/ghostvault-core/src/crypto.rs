//! Sealed credential packages
//!
//! The depositor encrypts the heir's access credential to the heir's
//! secp256k1 public key. Only the matching secret key opens it.
//!
//! # Construction
//!
//! - Fresh ephemeral keypair per package
//! - ECDH(ephemeral, beneficiary) hashed with SHA-256 into an AES-256 key
//! - AES-256-GCM provides authenticated encryption
//!
//! # Format
//!
//! ```text
//! [ephemeral pubkey (33 bytes)][nonce (12 bytes)][ciphertext + tag]
//! ```

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};
use secp256k1::ecdh::SharedSecret;
use secp256k1::{PublicKey, Secp256k1, SecretKey};
use sha2::{Digest, Sha256};
use thiserror::Error;
use zeroize::Zeroize;

/// Compressed secp256k1 public key length
const PUBKEY_LEN: usize = 33;

/// Nonce length for AES-256-GCM
const NONCE_LEN: usize = 12;

/// GCM authentication tag length
const TAG_LEN: usize = 16;

const KDF_DOMAIN: &[u8] = b"ghostvault/sealed-package/v1";

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),
    #[error("Invalid key: {0}")]
    InvalidKey(String),
    #[error("Invalid package format")]
    InvalidFormat,
}

/// An access credential encrypted to one beneficiary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedPackage {
    ephemeral: PublicKey,
    nonce: [u8; NONCE_LEN],
    ciphertext: Vec<u8>,
}

impl SealedPackage {
    /// Encrypt `plaintext` to `recipient`.
    pub fn seal(recipient: &PublicKey, plaintext: &[u8]) -> Result<Self, CryptoError> {
        let secp = Secp256k1::new();
        let (ephemeral_sk, ephemeral) = secp.generate_keypair(&mut rand::thread_rng());

        let shared = SharedSecret::new(recipient, &ephemeral_sk);
        let mut key = derive_key(&shared, &ephemeral, recipient);

        let nonce_arr = Aes256Gcm::generate_nonce(&mut OsRng);
        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(&nonce_arr);

        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));
        key.zeroize();
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

        Ok(Self {
            ephemeral,
            nonce,
            ciphertext,
        })
    }

    /// Decrypt with the beneficiary's secret key.
    ///
    /// # Errors
    /// Fails if the key does not match or the package was tampered with.
    pub fn open(&self, secret_key: &SecretKey) -> Result<Vec<u8>, CryptoError> {
        let secp = Secp256k1::new();
        let recipient = PublicKey::from_secret_key(&secp, secret_key);
        let shared = SharedSecret::new(&self.ephemeral, secret_key);
        let mut key = derive_key(&shared, &self.ephemeral, &recipient);

        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));
        key.zeroize();
        cipher
            .decrypt(Nonce::from_slice(&self.nonce), self.ciphertext.as_slice())
            .map_err(|_| {
                CryptoError::DecryptionFailed("Wrong key or corrupted package".to_string())
            })
    }

    /// Serialize to bytes: ephemeral || nonce || ciphertext
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(PUBKEY_LEN + NONCE_LEN + self.ciphertext.len());
        bytes.extend_from_slice(&self.ephemeral.serialize());
        bytes.extend_from_slice(&self.nonce);
        bytes.extend_from_slice(&self.ciphertext);
        bytes
    }

    /// Deserialize from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        // Minimum size: pubkey + nonce + at least 1 byte ciphertext + tag
        if bytes.len() < PUBKEY_LEN + NONCE_LEN + TAG_LEN + 1 {
            return Err(CryptoError::InvalidFormat);
        }

        let ephemeral =
            PublicKey::from_slice(&bytes[..PUBKEY_LEN]).map_err(|_| CryptoError::InvalidFormat)?;
        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(&bytes[PUBKEY_LEN..PUBKEY_LEN + NONCE_LEN]);
        let ciphertext = bytes[PUBKEY_LEN + NONCE_LEN..].to_vec();

        Ok(Self {
            ephemeral,
            nonce,
            ciphertext,
        })
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(s).map_err(|_| CryptoError::InvalidFormat)?;
        Self::from_bytes(&bytes)
    }
}

/// Hash the ECDH secret into an AES key, binding both public keys.
fn derive_key(shared: &SharedSecret, ephemeral: &PublicKey, recipient: &PublicKey) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(KDF_DOMAIN);
    hasher.update(shared.secret_bytes());
    hasher.update(ephemeral.serialize());
    hasher.update(recipient.serialize());
    hasher.finalize().into()
}

/// A beneficiary's keypair. The secret is wiped on drop.
pub struct BeneficiaryKeypair {
    secret: SecretKey,
    public: PublicKey,
}

impl BeneficiaryKeypair {
    pub fn generate() -> Self {
        let secp = Secp256k1::new();
        let (secret, public) = secp.generate_keypair(&mut rand::thread_rng());
        Self { secret, public }
    }

    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let secret =
            SecretKey::from_slice(bytes).map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        let public = PublicKey::from_secret_key(&Secp256k1::new(), &secret);
        Ok(Self { secret, public })
    }

    pub fn secret_key(&self) -> &SecretKey {
        &self.secret
    }

    pub fn public_key(&self) -> PublicKey {
        self.public
    }
}

impl Drop for BeneficiaryKeypair {
    fn drop(&mut self) {
        self.secret.non_secure_erase();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_open_roundtrip() {
        let heir = BeneficiaryKeypair::generate();
        let credential = b"ghost-usdc-100-deadbeef";

        let package = SealedPackage::seal(&heir.public_key(), credential).unwrap();
        let opened = package.open(heir.secret_key()).unwrap();

        assert_eq!(opened, credential);
    }

    #[test]
    fn test_wrong_key_fails() {
        let heir = BeneficiaryKeypair::generate();
        let stranger = BeneficiaryKeypair::generate();

        let package = SealedPackage::seal(&heir.public_key(), b"secret").unwrap();
        assert!(matches!(
            package.open(stranger.secret_key()),
            Err(CryptoError::DecryptionFailed(_))
        ));
    }

    #[test]
    fn test_each_seal_differs() {
        let heir = BeneficiaryKeypair::generate();
        let a = SealedPackage::seal(&heir.public_key(), b"same").unwrap();
        let b = SealedPackage::seal(&heir.public_key(), b"same").unwrap();

        // Fresh ephemeral key and nonce every time
        assert_ne!(a.to_bytes(), b.to_bytes());
        assert_eq!(a.open(heir.secret_key()).unwrap(), b"same");
        assert_eq!(b.open(heir.secret_key()).unwrap(), b"same");
    }

    #[test]
    fn test_hex_roundtrip() {
        let heir = BeneficiaryKeypair::generate();
        let package = SealedPackage::seal(&heir.public_key(), b"note").unwrap();

        let restored = SealedPackage::from_hex(&package.to_hex()).unwrap();
        assert_eq!(restored, package);
        assert_eq!(restored.open(heir.secret_key()).unwrap(), b"note");
    }

    #[test]
    fn test_tampered_package_fails() {
        let heir = BeneficiaryKeypair::generate();
        let package = SealedPackage::seal(&heir.public_key(), b"note").unwrap();

        let mut bytes = package.to_bytes();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;

        let tampered = SealedPackage::from_bytes(&bytes).unwrap();
        assert!(tampered.open(heir.secret_key()).is_err());
    }

    #[test]
    fn test_truncated_package_rejected() {
        assert!(matches!(
            SealedPackage::from_bytes(&[0u8; 20]),
            Err(CryptoError::InvalidFormat)
        ));
    }

    #[test]
    fn test_keypair_from_secret_bytes() {
        let original = BeneficiaryKeypair::generate();
        let restored =
            BeneficiaryKeypair::from_secret_bytes(&original.secret_key().secret_bytes()).unwrap();
        assert_eq!(original.public_key(), restored.public_key());

        assert!(BeneficiaryKeypair::from_secret_bytes(&[0u8; 32]).is_err());
    }
}
