//! Errors surfaced by the realtime layer.

use merit_types::TypeError;
use thiserror::Error;

/// Errors produced by room management and the websocket server.
#[derive(Debug, Error)]
pub enum RealtimeError {
    /// The room name is neither well-known nor a valid `user:<address>` room.
    #[error("unknown room: {0}")]
    UnknownRoom(String),

    /// Leaving a room the connection never joined.
    #[error("not in room: {0}")]
    NotInRoom(String),

    /// Every connection stays in the global room for its whole lifetime.
    #[error("the global room cannot be left")]
    LeaveGlobal,

    /// The connection id is not (or no longer) registered.
    #[error("unknown connection: {0}")]
    UnknownConnection(u64),

    #[error(transparent)]
    InvalidAddress(#[from] TypeError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
