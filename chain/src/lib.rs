//! Chain access for the merit rewards pipeline.
//!
//! Receipt lookups over JSON-RPC, the normalized receipt/log model, and the
//! contract event signatures verification matches against.

pub mod client;
pub mod error;
pub mod events;
pub mod receipt;

use async_trait::async_trait;
use merit_types::TxHash;

pub use client::ChainClient;
pub use error::ChainError;
pub use events::{event_topic, find_event, ChainEvent, DecodedEvent};
pub use receipt::{EventLog, RawReceipt, ReceiptStatus, TxReceipt};

/// What the verification service needs from the chain.
///
/// Implemented by [`ChainClient`] in production and by fixtures in tests.
#[async_trait]
pub trait ReceiptProvider: Send + Sync {
    /// The receipt for `tx_hash`, or `None` while the transaction is
    /// unknown, unmined, or buried less than `min_confirmations` blocks
    /// deep.
    async fn receipt(
        &self,
        tx_hash: &TxHash,
        min_confirmations: u64,
    ) -> Result<Option<TxReceipt>, ChainError>;
}
