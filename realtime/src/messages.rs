//! Control protocol frames and broadcast events.
//!
//! Clients speak a small JSON protocol tagged by `type`. Lifecycle events
//! fan out in a fixed envelope so consumers can route on `type` without
//! knowing the payload shape of every action kind.

use merit_types::{ActionKind, ActionPayload, ActionRecord, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Inbound control frames.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Bind a wallet to this connection and auto-join its user room.
    Authenticate { wallet: String },
    JoinRoom { room: String },
    LeaveRoom { room: String },
    Ping,
}

/// Outbound control frames.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Sent once immediately after the upgrade completes.
    ConnectionEstablished {
        connection_id: u64,
        rooms: Vec<String>,
    },
    Authenticated { wallet: String },
    RoomJoined { room: String },
    RoomLeft { room: String },
    Pong,
    Error { message: String },
}

/// A lifecycle event addressed to a set of rooms.
///
/// The wire envelope is `{"type", "payload", "action_id", "timestamp"}`;
/// rooms are routing metadata and never serialized.
#[derive(Clone, Debug)]
pub struct BroadcastEvent {
    /// Wire event name (`staking_update`, `reward_update`, `commit_update`).
    pub kind: String,
    pub action_id: String,
    pub payload: Value,
    /// Target rooms, in attribution order.
    pub rooms: Vec<String>,
}

impl BroadcastEvent {
    /// Build the event describing `record`'s current status.
    ///
    /// `reason` is carried in the payload for rollbacks so clients can show
    /// why an optimistic update was reversed.
    pub fn for_action(record: &ActionRecord, reason: Option<&str>) -> Self {
        let (event, family) = match record.kind {
            ActionKind::Stake | ActionKind::Unstake => ("staking_update", "staking"),
            ActionKind::Claim => ("reward_update", "rewards"),
            ActionKind::Commit => ("commit_update", "commits"),
        };
        let amount_key = match record.payload {
            ActionPayload::Commit { .. } => "reward",
            _ => "amount",
        };

        let mut payload = json!({
            "action_id": record.id.to_string(),
            "kind": record.kind.as_str(),
            "status": record.status.to_string(),
            "wallet": record.actor.to_string(),
            amount_key: record.payload.amount().to_string(),
        });
        if let Some(reason) = reason {
            payload["reason"] = Value::String(reason.to_string());
        }

        Self {
            kind: event.to_string(),
            action_id: record.id.to_string(),
            payload,
            rooms: vec![
                "global".to_string(),
                family.to_string(),
                format!("user:{}", record.actor),
            ],
        }
    }

    /// Serialize the wire envelope.
    pub fn envelope(&self, now: Timestamp) -> String {
        json!({
            "type": self.kind,
            "payload": self.payload,
            "action_id": self.action_id,
            "timestamp": now.as_secs(),
        })
        .to_string()
    }
}
