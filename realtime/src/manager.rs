//! Connection registry and room-based fanout.
//!
//! Shared between the websocket server (which registers connections and
//! applies control frames) and the pipeline (which broadcasts lifecycle
//! events). All state lives behind one `RwLock`; broadcast takes the write
//! lock so a dead connection can be evicted in the same critical section
//! that discovers it.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::RwLock;

use merit_types::{Timestamp, WalletAddress};

use crate::error::RealtimeError;
use crate::messages::BroadcastEvent;

/// Room every connection joins at registration and can never leave.
pub const GLOBAL_ROOM: &str = "global";

/// Rooms that exist without a wallet qualifier.
const WELL_KNOWN_ROOMS: [&str; 4] = [GLOBAL_ROOM, "staking", "commits", "rewards"];

/// Prefix of per-wallet rooms (`user:<address>`).
pub const USER_ROOM_PREFIX: &str = "user:";

/// Process-local identifier for a websocket connection.
pub type ConnectionId = u64;

/// Per-connection state tracked by the manager.
pub struct ConnectionHandle {
    pub id: ConnectionId,
    /// Set after a successful `authenticate` frame.
    pub wallet: Option<WalletAddress>,
    /// Queue drained by the connection's writer task.
    pub outbound: UnboundedSender<String>,
    pub rooms: HashSet<String>,
    pub connected_at: Timestamp,
    /// Refreshed on every inbound frame; drives the staleness sweep.
    pub last_seen: Timestamp,
}

/// Outcome of one broadcast: deliveries queued vs. connections found dead.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub sent: usize,
    pub failed: usize,
}

#[derive(Default)]
struct RegistryState {
    connections: HashMap<ConnectionId, ConnectionHandle>,
    rooms: HashMap<String, HashSet<ConnectionId>>,
}

/// Validate a room name: well-known rooms pass, `user:` rooms must carry a
/// parseable wallet address, everything else is rejected.
fn validate_room(room: &str) -> Result<(), RealtimeError> {
    if WELL_KNOWN_ROOMS.contains(&room) {
        return Ok(());
    }
    match room.strip_prefix(USER_ROOM_PREFIX) {
        Some(address) if WalletAddress::parse(address).is_ok() => Ok(()),
        _ => Err(RealtimeError::UnknownRoom(room.to_string())),
    }
}

/// Drop a connection and unlink it from every room it was in.
fn remove_connection(state: &mut RegistryState, id: ConnectionId) -> Option<ConnectionHandle> {
    let handle = state.connections.remove(&id)?;
    for room in &handle.rooms {
        let emptied = state
            .rooms
            .get_mut(room)
            .map(|members| {
                members.remove(&id);
                members.is_empty()
            })
            .unwrap_or(false);
        if emptied {
            state.rooms.remove(room);
        }
    }
    Some(handle)
}

/// Registry of live websocket connections and their room memberships.
pub struct BroadcastManager {
    state: RwLock<RegistryState>,
    next_id: AtomicU64,
}

impl BroadcastManager {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(RegistryState::default()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Register a connection, placing it in the global room.
    pub async fn register(&self, outbound: UnboundedSender<String>, now: Timestamp) -> ConnectionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let mut state = self.state.write().await;

        let mut rooms = HashSet::new();
        rooms.insert(GLOBAL_ROOM.to_string());
        state.connections.insert(
            id,
            ConnectionHandle {
                id,
                wallet: None,
                outbound,
                rooms,
                connected_at: now,
                last_seen: now,
            },
        );
        state
            .rooms
            .entry(GLOBAL_ROOM.to_string())
            .or_default()
            .insert(id);

        tracing::debug!(connection = id, "websocket connection registered");
        id
    }

    /// Remove a connection. Returns `false` if it was already gone.
    pub async fn deregister(&self, id: ConnectionId) -> bool {
        let mut state = self.state.write().await;
        remove_connection(&mut state, id).is_some()
    }

    /// Bind a wallet to the connection and join its `user:` room.
    pub async fn authenticate(
        &self,
        id: ConnectionId,
        wallet: &str,
        now: Timestamp,
    ) -> Result<WalletAddress, RealtimeError> {
        let address = WalletAddress::parse(wallet)?;
        let mut state = self.state.write().await;
        let handle = state
            .connections
            .get_mut(&id)
            .ok_or(RealtimeError::UnknownConnection(id))?;

        handle.wallet = Some(address.clone());
        handle.last_seen = now;
        let room = format!("{USER_ROOM_PREFIX}{address}");
        handle.rooms.insert(room.clone());
        state.rooms.entry(room).or_default().insert(id);

        tracing::debug!(connection = id, wallet = %address, "connection authenticated");
        Ok(address)
    }

    pub async fn join_room(
        &self,
        id: ConnectionId,
        room: &str,
        now: Timestamp,
    ) -> Result<(), RealtimeError> {
        validate_room(room)?;
        let mut state = self.state.write().await;
        let handle = state
            .connections
            .get_mut(&id)
            .ok_or(RealtimeError::UnknownConnection(id))?;

        handle.last_seen = now;
        handle.rooms.insert(room.to_string());
        state.rooms.entry(room.to_string()).or_default().insert(id);
        Ok(())
    }

    pub async fn leave_room(
        &self,
        id: ConnectionId,
        room: &str,
        now: Timestamp,
    ) -> Result<(), RealtimeError> {
        if room == GLOBAL_ROOM {
            return Err(RealtimeError::LeaveGlobal);
        }
        let mut state = self.state.write().await;
        let handle = state
            .connections
            .get_mut(&id)
            .ok_or(RealtimeError::UnknownConnection(id))?;

        handle.last_seen = now;
        if !handle.rooms.remove(room) {
            return Err(RealtimeError::NotInRoom(room.to_string()));
        }
        let emptied = state
            .rooms
            .get_mut(room)
            .map(|members| {
                members.remove(&id);
                members.is_empty()
            })
            .unwrap_or(false);
        if emptied {
            state.rooms.remove(room);
        }
        Ok(())
    }

    /// Refresh the connection's idle clock.
    pub async fn touch(&self, id: ConnectionId, now: Timestamp) {
        let mut state = self.state.write().await;
        if let Some(handle) = state.connections.get_mut(&id) {
            handle.last_seen = now;
        }
    }

    /// Deliver `event` to the union of its rooms.
    ///
    /// Each connection receives the envelope at most once, attributed to the
    /// first room that selected it. A closed outbound channel counts as a
    /// failed delivery and evicts that connection; other deliveries proceed.
    pub async fn broadcast(&self, event: &BroadcastEvent) -> DeliveryReport {
        let message = event.envelope(Timestamp::now());
        let mut state = self.state.write().await;

        let mut targets: Vec<(ConnectionId, &str)> = Vec::new();
        let mut seen: HashSet<ConnectionId> = HashSet::new();
        for room in &event.rooms {
            if let Some(members) = state.rooms.get(room.as_str()) {
                for &id in members {
                    if seen.insert(id) {
                        targets.push((id, room.as_str()));
                    }
                }
            }
        }

        let mut report = DeliveryReport::default();
        let mut dead: Vec<ConnectionId> = Vec::new();
        for (id, room) in targets {
            let Some(handle) = state.connections.get(&id) else {
                continue;
            };
            if handle.outbound.send(message.clone()).is_ok() {
                report.sent += 1;
            } else {
                report.failed += 1;
                dead.push(id);
                tracing::warn!(connection = id, room = %room, "outbound channel closed, evicting");
            }
        }
        for id in dead {
            remove_connection(&mut state, id);
        }

        tracing::debug!(
            event = %event.kind,
            action = %event.action_id,
            sent = report.sent,
            failed = report.failed,
            "broadcast delivered"
        );
        report
    }

    /// Evict connections idle longer than `max_idle_secs`. Returns the number
    /// evicted. Dropping the handle closes its outbound channel, which ends
    /// the writer task and the socket.
    pub async fn sweep_stale(&self, now: Timestamp, max_idle_secs: u64) -> usize {
        let mut state = self.state.write().await;
        let stale: Vec<ConnectionId> = state
            .connections
            .values()
            .filter(|handle| handle.last_seen.has_expired(max_idle_secs, now))
            .map(|handle| handle.id)
            .collect();

        for &id in &stale {
            remove_connection(&mut state, id);
            tracing::info!(connection = id, "evicted stale connection");
        }
        stale.len()
    }

    pub async fn connection_count(&self) -> usize {
        self.state.read().await.connections.len()
    }

    /// Rooms the connection currently belongs to (observability and tests).
    pub async fn rooms_of(&self, id: ConnectionId) -> Option<Vec<String>> {
        let state = self.state.read().await;
        state.connections.get(&id).map(|handle| {
            let mut rooms: Vec<String> = handle.rooms.iter().cloned().collect();
            rooms.sort();
            rooms
        })
    }
}

impl Default for BroadcastManager {
    fn default() -> Self {
        Self::new()
    }
}
