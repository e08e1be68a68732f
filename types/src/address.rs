//! Wallet address type with `0x` prefix.

use crate::error::TypeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An EVM-style wallet address: `0x` followed by 40 hex characters.
///
/// Addresses are normalized to lowercase on parse so that store keys and
/// room names never depend on caller casing.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WalletAddress(String);

impl WalletAddress {
    /// The standard prefix for all wallet addresses.
    pub const PREFIX: &'static str = "0x";

    /// Number of hex characters after the prefix.
    pub const HEX_LEN: usize = 40;

    /// Parse and normalize an address string.
    pub fn parse(raw: &str) -> Result<Self, TypeError> {
        let lower = raw.to_ascii_lowercase();
        let hex_part = lower
            .strip_prefix(Self::PREFIX)
            .ok_or_else(|| TypeError::InvalidAddress(raw.to_string()))?;
        if hex_part.len() != Self::HEX_LEN || !hex_part.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidAddress(raw.to_string()));
        }
        Ok(Self(lower))
    }

    /// Return the raw address string (always lowercase).
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for WalletAddress {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
