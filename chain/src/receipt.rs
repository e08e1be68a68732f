//! Receipt and log model, normalized from the JSON-RPC wire shape.

use merit_types::TxHash;
use serde::Deserialize;

use crate::error::ChainError;

/// Terminal status of a mined transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReceiptStatus {
    Success,
    Reverted,
}

/// One event log from a receipt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventLog {
    /// Emitting contract address, lowercase hex.
    pub address: String,
    pub topics: Vec<[u8; 32]>,
    pub data: Vec<u8>,
}

/// A mined transaction receipt.
#[derive(Clone, Debug)]
pub struct TxReceipt {
    pub tx_hash: TxHash,
    pub block_number: u64,
    pub status: ReceiptStatus,
    /// Depth of the containing block below the chain head, inclusive.
    pub confirmations: u64,
    pub logs: Vec<EventLog>,
}

/// `eth_getTransactionReceipt` result as it appears on the wire.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawReceipt {
    pub transaction_hash: String,
    /// Missing while the transaction is still in the mempool.
    #[serde(default)]
    pub block_number: Option<String>,
    pub status: String,
    #[serde(default)]
    pub logs: Vec<RawLog>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RawLog {
    pub address: String,
    pub topics: Vec<String>,
    pub data: String,
}

/// Parse a `0x`-prefixed hex quantity.
pub fn parse_quantity(raw: &str) -> Result<u64, ChainError> {
    let digits = raw
        .strip_prefix("0x")
        .ok_or_else(|| ChainError::InvalidResponse(format!("quantity without 0x prefix: {raw}")))?;
    if digits.is_empty() {
        return Err(ChainError::InvalidResponse(format!("empty quantity: {raw}")));
    }
    u64::from_str_radix(digits, 16)
        .map_err(|e| ChainError::InvalidResponse(format!("bad quantity {raw}: {e}")))
}

fn parse_hex_bytes(raw: &str) -> Result<Vec<u8>, ChainError> {
    let digits = raw.strip_prefix("0x").unwrap_or(raw);
    hex::decode(digits).map_err(|e| ChainError::InvalidResponse(format!("bad hex {raw}: {e}")))
}

fn parse_topic(raw: &str) -> Result<[u8; 32], ChainError> {
    let bytes = parse_hex_bytes(raw)?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| ChainError::InvalidResponse(format!("topic is not 32 bytes: {raw}")))
}

impl TxReceipt {
    /// Normalize a wire receipt against chain head `head`. Returns `None`
    /// for a receipt without a block number (still pending on some nodes).
    pub fn from_raw(raw: &RawReceipt, head: u64) -> Result<Option<Self>, ChainError> {
        let block_hex = match raw.block_number.as_deref() {
            Some(hex) => hex,
            None => return Ok(None),
        };
        let block_number = parse_quantity(block_hex)?;
        let status = match raw.status.as_str() {
            "0x1" => ReceiptStatus::Success,
            "0x0" => ReceiptStatus::Reverted,
            other => {
                return Err(ChainError::InvalidResponse(format!(
                    "unknown receipt status: {other}"
                )))
            }
        };
        let tx_hash = TxHash::parse(&raw.transaction_hash)
            .map_err(|e| ChainError::InvalidResponse(e.to_string()))?;

        let mut logs = Vec::with_capacity(raw.logs.len());
        for log in &raw.logs {
            let mut topics = Vec::with_capacity(log.topics.len());
            for topic in &log.topics {
                topics.push(parse_topic(topic)?);
            }
            logs.push(EventLog {
                address: log.address.to_ascii_lowercase(),
                topics,
                data: parse_hex_bytes(&log.data)?,
            });
        }

        // A head lagging the serving node still means the block exists.
        let confirmations = head.saturating_sub(block_number).saturating_add(1);
        Ok(Some(Self {
            tx_hash,
            block_number,
            status,
            confirmations,
            logs,
        }))
    }
}
