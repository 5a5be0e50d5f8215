//! Supported assets and destination addresses

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("Unsupported asset: {0}")]
    UnsupportedAsset(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),
}

/// Assets the pool accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Asset {
    Usdc,
    Usdt,
}

impl Asset {
    pub const ALL: [Asset; 2] = [Asset::Usdc, Asset::Usdt];

    pub fn symbol(&self) -> &'static str {
        match self {
            Asset::Usdc => "USDC",
            Asset::Usdt => "USDT",
        }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Asset {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USDC" => Ok(Asset::Usdc),
            "USDT" => Ok(Asset::Usdt),
            _ => Err(AddressError::UnsupportedAsset(s.to_string())),
        }
    }
}

/// A syntactically valid account address: `0x` followed by 40 hex digits.
///
/// Stored lowercase so two spellings of one address compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    pub fn parse(s: &str) -> Result<Self, AddressError> {
        let s = s.trim();
        let body = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or_else(|| AddressError::InvalidAddress(s.to_string()))?;

        if body.len() != 40 || !body.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(AddressError::InvalidAddress(s.to_string()));
        }

        Ok(Self(format!("0x{}", body.to_ascii_lowercase())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = AddressError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Address> for String {
    fn from(a: Address) -> Self {
        a.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_parsing() {
        assert_eq!("USDC".parse::<Asset>().unwrap(), Asset::Usdc);
        assert_eq!("usdt".parse::<Asset>().unwrap(), Asset::Usdt);
        assert!(matches!(
            "DAI".parse::<Asset>(),
            Err(AddressError::UnsupportedAsset(_))
        ));
    }

    #[test]
    fn test_valid_address() {
        let addr = Address::parse("0x71C7656EC7ab88b098defB751B7401B5f6d8976F").unwrap();
        assert_eq!(addr.as_str(), "0x71c7656ec7ab88b098defb751b7401b5f6d8976f");
    }

    #[test]
    fn test_invalid_addresses() {
        for bad in [
            "",
            "0x",
            "0xFRESH",
            "71C7656EC7ab88b098defB751B7401B5f6d8976F",
            "0x71C7656EC7ab88b098defB751B7401B5f6d8976",
            "0x71C7656EC7ab88b098defB751B7401B5f6d8976FF",
            "0xZZC7656EC7ab88b098defB751B7401B5f6d8976F",
        ] {
            assert!(Address::parse(bad).is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn test_address_serde_validates() {
        let ok: Address =
            serde_json::from_str("\"0x0000000000000000000000000000000000000001\"").unwrap();
        assert_eq!(ok.as_str(), "0x0000000000000000000000000000000000000001");

        let bad: Result<Address, _> = serde_json::from_str("\"0x123\"");
        assert!(bad.is_err());
    }
}
