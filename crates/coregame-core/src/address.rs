//! # Address
//!
//! 20-byte account and contract addresses.
//!
//! Addresses are parsed case-insensitively and always rendered lowercase,
//! so they can be used directly as storage keys. [`Address::to_checksum`]
//! produces the mixed-case EIP-55 form for display.

use crate::error::{CoreError, Result};
use crate::selector::keccak256;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A 20-byte account or contract address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The zero address.
    pub const ZERO: Self = Self([0u8; 20]);

    /// Parse an address from `0x` + 40 hex digits.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .ok_or_else(|| CoreError::InvalidAddress(input.to_string()))?;
        if digits.len() != 40 {
            return Err(CoreError::InvalidAddress(input.to_string()));
        }
        let mut bytes = [0u8; 20];
        hex::decode_to_slice(digits, &mut bytes)
            .map_err(|_| CoreError::InvalidAddress(input.to_string()))?;
        Ok(Self(bytes))
    }

    /// Check whether this is the zero address.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// Render the EIP-55 mixed-case checksum form.
    #[must_use]
    pub fn to_checksum(&self) -> String {
        let lower = hex::encode(self.0);
        let hash = keccak256(lower.as_bytes());

        let mut out = String::with_capacity(42);
        out.push_str("0x");
        for (i, ch) in lower.chars().enumerate() {
            let byte = hash[i / 2];
            let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0f };
            if ch.is_ascii_alphabetic() && nibble >= 8 {
                out.push(ch.to_ascii_uppercase());
            } else {
                out.push(ch);
            }
        }
        out
    }

    /// Shortened form: first 8 characters and last 6 of the lowercase rendering.
    #[must_use]
    pub fn abbreviated(&self) -> String {
        let full = self.to_string();
        format!("{}...{}", &full[..8], &full[full.len() - 6..])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_mixed_case() {
        let addr = Address::parse("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed");
        assert!(addr.is_ok());
        assert_eq!(
            addr.map(|a| a.to_string()).ok(),
            Some("0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed".to_string())
        );
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert!(Address::parse("5aaeb6053f3e94c9b9a09f33669435e7ef1beaed").is_err());
        assert!(Address::parse("0x1234").is_err());
        assert!(Address::parse("0xzzzeb6053f3e94c9b9a09f33669435e7ef1beaed").is_err());
    }

    #[test]
    fn checksum_matches_eip55_vector() {
        let addr = Address::parse("0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed").ok();
        assert_eq!(
            addr.map(|a| a.to_checksum()),
            Some("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed".to_string())
        );
    }

    #[test]
    fn abbreviated_keeps_prefix_and_suffix() {
        let addr = Address::parse("0x1234567890abcdef1234567890abcdef12345678").ok();
        assert_eq!(
            addr.map(|a| a.abbreviated()),
            Some("0x123456...345678".to_string())
        );
    }

    #[test]
    fn zero_address() {
        assert!(Address::ZERO.is_zero());
        assert_eq!(
            Address::ZERO.to_string(),
            "0x0000000000000000000000000000000000000000"
        );
    }

    #[test]
    fn serde_uses_hex_string() {
        let addr = Address([0xab; 20]);
        let json = serde_json::to_string(&addr).ok();
        assert_eq!(
            json,
            Some("\"0xabababababababababababababababababababab\"".to_string())
        );
        let back: Option<Address> = json.and_then(|j| serde_json::from_str(&j).ok());
        assert_eq!(back, Some(addr));
    }
}
