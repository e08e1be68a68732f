//! HTTP JSON-RPC client against an EVM node.

use std::time::Duration;

use async_trait::async_trait;
use merit_types::TxHash;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ChainError;
use crate::receipt::{parse_quantity, RawReceipt, TxReceipt};
use crate::ReceiptProvider;

#[derive(Debug, Deserialize)]
struct RpcEnvelope {
    /// `null` is a valid result (unknown transaction), so this is a plain
    /// `Value` rather than an `Option`.
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// Reusable JSON-RPC client.
pub struct ChainClient {
    endpoint: String,
    client: reqwest::Client,
    request_timeout: Duration,
}

impl ChainClient {
    pub fn new(endpoint: &str, request_timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            request_timeout,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn rpc(&self, method: &str, params: Value) -> Result<Value, ChainError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });
        let resp = self
            .client
            .post(&self.endpoint)
            .timeout(self.request_timeout)
            .json(&body)
            .send()
            .await
            .map_err(ChainError::from_reqwest)?;

        if !resp.status().is_success() {
            return Err(ChainError::Transport(format!(
                "HTTP {} from {}",
                resp.status(),
                self.endpoint
            )));
        }

        let envelope: RpcEnvelope = resp.json().await.map_err(ChainError::from_reqwest)?;
        if let Some(err) = envelope.error {
            return Err(ChainError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        Ok(envelope.result)
    }

    /// Current chain head block number.
    pub async fn block_number(&self) -> Result<u64, ChainError> {
        let result = self.rpc("eth_blockNumber", json!([])).await?;
        let raw = result
            .as_str()
            .ok_or_else(|| ChainError::InvalidResponse("eth_blockNumber is not a string".into()))?;
        parse_quantity(raw)
    }

    /// Wire receipt for `tx_hash`, `None` while the node does not know it.
    pub async fn transaction_receipt(
        &self,
        tx_hash: &TxHash,
    ) -> Result<Option<RawReceipt>, ChainError> {
        let result = self
            .rpc("eth_getTransactionReceipt", json!([tx_hash.to_string()]))
            .await?;
        if result.is_null() {
            return Ok(None);
        }
        let raw: RawReceipt = serde_json::from_value(result)
            .map_err(|e| ChainError::InvalidResponse(format!("receipt shape: {e}")))?;
        Ok(Some(raw))
    }
}

#[async_trait]
impl ReceiptProvider for ChainClient {
    async fn receipt(
        &self,
        tx_hash: &TxHash,
        min_confirmations: u64,
    ) -> Result<Option<TxReceipt>, ChainError> {
        let raw = match self.transaction_receipt(tx_hash).await? {
            Some(raw) => raw,
            None => return Ok(None),
        };
        let head = self.block_number().await?;
        match TxReceipt::from_raw(&raw, head)? {
            Some(receipt) if receipt.confirmations >= min_confirmations => Ok(Some(receipt)),
            _ => Ok(None),
        }
    }
}
