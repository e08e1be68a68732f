//! Realtime fanout for the merit rewards pipeline.
//!
//! Connections join rooms (`global`, `staking`, `commits`, `rewards`,
//! `user:<address>`) and receive lifecycle events for the actions those
//! rooms cover. The [`BroadcastManager`] tracks membership and delivery;
//! the [`RealtimeServer`] speaks the websocket control protocol.

pub mod error;
pub mod manager;
pub mod messages;
pub mod server;

pub use error::RealtimeError;
pub use manager::{
    BroadcastManager, ConnectionHandle, ConnectionId, DeliveryReport, GLOBAL_ROOM,
    USER_ROOM_PREFIX,
};
pub use messages::{BroadcastEvent, ClientMessage, ServerMessage};
pub use server::RealtimeServer;
