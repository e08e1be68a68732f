//! Hash types for on-chain transactions and git commits.

use crate::error::TypeError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A 32-byte on-chain transaction hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TxHash([u8; 32]);

impl TxHash {
    pub const ZERO: Self = Self([0u8; 32]);

    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Parse from a `0x`-prefixed 64-character hex string.
    pub fn parse(raw: &str) -> Result<Self, TypeError> {
        let hex_part = raw
            .strip_prefix("0x")
            .ok_or_else(|| TypeError::InvalidTxHash(raw.to_string()))?;
        if hex_part.len() != 64 {
            return Err(TypeError::InvalidTxHash(raw.to_string()));
        }
        let decoded =
            hex::decode(hex_part).map_err(|_| TypeError::InvalidTxHash(raw.to_string()))?;
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&decoded);
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Debug for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxHash(0x{}\u{2026})", hex::encode(&self.0[..4]))
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// A git commit id: 40 lowercase hex characters, no prefix.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CommitHash(String);

impl CommitHash {
    /// Length of a full SHA-1 commit id in hex characters.
    pub const HEX_LEN: usize = 40;

    /// Parse and normalize a commit id.
    pub fn parse(raw: &str) -> Result<Self, TypeError> {
        let lower = raw.to_ascii_lowercase();
        if lower.len() != Self::HEX_LEN || !lower.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidCommitHash(raw.to_string()));
        }
        Ok(Self(lower))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommitHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
