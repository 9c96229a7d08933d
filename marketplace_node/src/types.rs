//! Core marketplace types and units.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Token identifier minted by the `DatasetNFT` contract. Ids start at 1.
pub type TokenId = u64;

/// Rental durations are quoted in whole days.
pub const SECONDS_PER_DAY: u64 = 86_400;

/// Address validation failures
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AddressError {
    /// Missing the `0x` prefix
    #[error("address must start with 0x: {0}")]
    MissingPrefix(String),
    /// Wrong number of hex digits
    #[error("address must be 20 bytes of hex: {0}")]
    BadLength(String),
    /// Non-hex characters after the prefix
    #[error("address contains non-hex characters: {0}")]
    BadHex(String),
}

/// Wallet or contract address: `0x` followed by 40 hex digits.
///
/// Stored lowercased so map lookups are case-insensitive with respect to the
/// mixed-case checksummed form callers may submit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Parse and normalize an address string.
    pub fn parse(raw: &str) -> Result<Self, AddressError> {
        let digits = raw
            .strip_prefix("0x")
            .ok_or_else(|| AddressError::MissingPrefix(raw.to_string()))?;
        if digits.len() != 40 {
            return Err(AddressError::BadLength(raw.to_string()));
        }
        if hex::decode(digits).is_err() {
            return Err(AddressError::BadHex(raw.to_string()));
        }
        Ok(Self(format!("0x{}", digits.to_ascii_lowercase())))
    }

    /// Build an address from a small integer. Handy for well-known accounts
    /// (the contract account) and for tests.
    pub fn from_low_u64(value: u64) -> Self {
        Self(format!("0x{value:040x}"))
    }

    /// The all-zeroes address.
    pub fn zero() -> Self {
        Self::from_low_u64(0)
    }

    /// Whether this is the all-zeroes address.
    pub fn is_zero(&self) -> bool {
        self.0[2..].bytes().all(|b| b == b'0')
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
