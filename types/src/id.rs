//! Opaque identifiers for action records and verification entries.

use crate::error::TypeError;
use serde::{Deserialize, Serialize};
use std::fmt;

fn parse_id_bytes(raw: &str) -> Result<[u8; 16], TypeError> {
    if raw.len() != 32 {
        return Err(TypeError::InvalidId(raw.to_string()));
    }
    let decoded = hex::decode(raw).map_err(|_| TypeError::InvalidId(raw.to_string()))?;
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&decoded);
    Ok(bytes)
}

/// Identifier of an [`ActionRecord`](crate::ActionRecord).
///
/// 16 random bytes generated at submission, displayed as 32 hex characters.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActionId([u8; 16]);

impl ActionId {
    pub fn generate() -> Self {
        Self(rand::random())
    }

    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    pub fn parse(raw: &str) -> Result<Self, TypeError> {
        parse_id_bytes(raw).map(Self)
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Debug for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ActionId({}\u{2026})", hex::encode(&self.0[..4]))
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Identifier of a [`VerificationEntry`](crate::VerificationEntry).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntryId([u8; 16]);

impl EntryId {
    pub fn generate() -> Self {
        Self(rand::random())
    }

    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    pub fn parse(raw: &str) -> Result<Self, TypeError> {
        parse_id_bytes(raw).map(Self)
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Debug for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntryId({}\u{2026})", hex::encode(&self.0[..4]))
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}
