//! Vault notes
//!
//! A note is the only credential that proves ownership of a shielded
//! deposit. The pool keeps the note's [`Commitment`] and never the note, so a
//! lost note cannot be recovered.
//!
//! # Format
//!
//! ```text
//! ghost-<asset>-<amount>-<secret>
//! ghost-usdc-100-3f9a…(64 hex chars)
//! ```

use crate::address::Asset;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

const NOTE_PREFIX: &str = "ghost";
const SECRET_LEN: usize = 32;

const COMMITMENT_DOMAIN: &[u8] = b"ghostvault/commitment";
const NULLIFIER_DOMAIN: &[u8] = b"ghostvault/nullifier";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NoteError {
    #[error("Malformed note")]
    Malformed,

    #[error("Unsupported asset in note: {0}")]
    UnsupportedAsset(String),

    #[error("Invalid amount in note")]
    InvalidAmount,

    #[error("Invalid note secret")]
    InvalidSecret,

    #[error("Invalid digest: {0}")]
    InvalidDigest(String),
}

/// Macro for 32-byte digest newtypes that display and serialize as hex
macro_rules! digest_newtype {
    ($name:ident) => {
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name([u8; 32]);

        impl $name {
            pub fn from_bytes(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }

            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({}…)", stringify!($name), &self.to_hex()[..12])
            }
        }

        impl FromStr for $name {
            type Err = NoteError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let bytes = hex::decode(s).map_err(|e| NoteError::InvalidDigest(e.to_string()))?;
                let arr: [u8; 32] = bytes
                    .try_into()
                    .map_err(|_| NoteError::InvalidDigest("expected 32 bytes".into()))?;
                Ok(Self(arr))
            }
        }

        impl Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

digest_newtype!(Commitment);
digest_newtype!(Nullifier);

/// Secret note issued on deposit.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct VaultNote {
    secret: [u8; SECRET_LEN],
    #[zeroize(skip)]
    asset: Asset,
    amount: u64,
}

impl VaultNote {
    /// Generate a fresh note for a deposit.
    pub fn generate(asset: Asset, amount: u64) -> Self {
        let mut secret = [0u8; SECRET_LEN];
        rand::thread_rng().fill_bytes(&mut secret);
        Self {
            secret,
            asset,
            amount,
        }
    }

    pub fn asset(&self) -> Asset {
        self.asset
    }

    pub fn amount(&self) -> u64 {
        self.amount
    }

    /// Public binding of this note to its deposited value.
    pub fn commitment(&self) -> Commitment {
        let mut hasher = Sha256::new();
        hasher.update(COMMITMENT_DOMAIN);
        hasher.update(self.secret);
        hasher.update(self.asset.symbol().as_bytes());
        hasher.update(self.amount.to_be_bytes());
        Commitment(hasher.finalize().into())
    }

    /// Spend tag revealed on withdrawal. Unlinkable to the commitment without the secret.
    pub fn nullifier(&self) -> Nullifier {
        let mut hasher = Sha256::new();
        hasher.update(NULLIFIER_DOMAIN);
        hasher.update(self.secret);
        Nullifier(hasher.finalize().into())
    }

    /// Encode to the textual note format.
    pub fn encode(&self) -> String {
        format!(
            "{}-{}-{}-{}",
            NOTE_PREFIX,
            self.asset.symbol().to_ascii_lowercase(),
            self.amount,
            hex::encode(self.secret)
        )
    }

    /// Parse the textual note format.
    pub fn parse(s: &str) -> Result<Self, NoteError> {
        let mut parts = s.trim().splitn(4, '-');
        let (prefix, asset, amount, secret) =
            match (parts.next(), parts.next(), parts.next(), parts.next()) {
                (Some(p), Some(a), Some(m), Some(s)) => (p, a, m, s),
                _ => return Err(NoteError::Malformed),
            };

        if prefix != NOTE_PREFIX {
            return Err(NoteError::Malformed);
        }

        let asset = Asset::from_str(asset)
            .map_err(|_| NoteError::UnsupportedAsset(asset.to_string()))?;

        if !amount.chars().all(|c| c.is_ascii_digit()) {
            return Err(NoteError::InvalidAmount);
        }
        let amount: u64 = amount.parse().map_err(|_| NoteError::InvalidAmount)?;
        if amount == 0 {
            return Err(NoteError::InvalidAmount);
        }

        if secret.len() != SECRET_LEN * 2 {
            return Err(NoteError::InvalidSecret);
        }
        let mut bytes = hex::decode(secret).map_err(|_| NoteError::InvalidSecret)?;
        let mut secret = [0u8; SECRET_LEN];
        secret.copy_from_slice(&bytes);
        bytes.zeroize();

        Ok(Self {
            secret,
            asset,
            amount,
        })
    }
}

impl fmt::Debug for VaultNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VaultNote")
            .field("asset", &self.asset)
            .field("amount", &self.amount)
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl FromStr for VaultNote {
    type Err = NoteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
