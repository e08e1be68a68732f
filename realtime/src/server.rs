//! Websocket server.
//!
//! Upgrades clients at `/ws`, speaks the control protocol from
//! [`crate::messages`], and mirrors every delivery through the
//! [`BroadcastManager`]. The same router serves `/health` and a
//! Prometheus `/metrics` endpoint.

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use futures_util::{SinkExt, StreamExt};
use prometheus::{Registry, TextEncoder};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use merit_types::Timestamp;

use crate::error::RealtimeError;
use crate::manager::{BroadcastManager, ConnectionId, GLOBAL_ROOM};
use crate::messages::{ClientMessage, ServerMessage};

struct AppState {
    manager: Arc<BroadcastManager>,
    registry: Arc<Registry>,
}

/// The realtime HTTP/websocket server.
pub struct RealtimeServer {
    port: u16,
    manager: Arc<BroadcastManager>,
    registry: Arc<Registry>,
}

impl RealtimeServer {
    pub fn new(port: u16, manager: Arc<BroadcastManager>, registry: Arc<Registry>) -> Self {
        Self {
            port,
            manager,
            registry,
        }
    }

    /// Bind and serve until the shutdown channel fires. In-flight websocket
    /// tasks finish their own cleanup when the sockets close.
    pub async fn start(
        &self,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), RealtimeError> {
        let state = Arc::new(AppState {
            manager: Arc::clone(&self.manager),
            registry: Arc::clone(&self.registry),
        });
        let app = Router::new()
            .route("/ws", get(ws_handler))
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .with_state(state);

        let addr = format!("0.0.0.0:{}", self.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        info!("realtime server listening on {addr}");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;
        Ok(())
    }
}

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let families = state.registry.gather();
    match encoder.encode_to_string(&families) {
        Ok(body) => (StatusCode::OK, body).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("metrics encoding failed: {e}"),
        )
            .into_response(),
    }
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let manager = Arc::clone(&state.manager);
    ws.on_upgrade(move |socket| handle_socket(socket, manager))
}

/// Drive one websocket connection.
///
/// The socket is split: a writer task drains the connection's outbound
/// queue, the read loop parses control frames. Every inbound frame
/// refreshes the idle clock. Whichever way the socket ends, the connection
/// is deregistered before the handler returns.
async fn handle_socket(socket: WebSocket, manager: Arc<BroadcastManager>) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();

    let id = manager.register(outbound_tx.clone(), Timestamp::now()).await;
    debug!(connection = id, "websocket client connected");

    let writer = tokio::spawn(async move {
        while let Some(text) = outbound_rx.recv().await {
            if ws_sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    send_control(
        &outbound_tx,
        &ServerMessage::ConnectionEstablished {
            connection_id: id,
            rooms: vec![GLOBAL_ROOM.to_string()],
        },
    );

    while let Some(frame) = ws_receiver.next().await {
        let msg = match frame {
            Ok(msg) => msg,
            Err(e) => {
                warn!(connection = id, "websocket receive error: {e}");
                break;
            }
        };
        manager.touch(id, Timestamp::now()).await;

        match msg {
            Message::Text(text) => {
                handle_client_message(&manager, id, &outbound_tx, &text).await;
            }
            Message::Close(_) => {
                debug!(connection = id, "client sent close frame");
                break;
            }
            // Protocol-level pings are answered by the websocket stack; the
            // touch above is all they are for here.
            Message::Ping(_) | Message::Pong(_) | Message::Binary(_) => {}
        }
    }

    manager.deregister(id).await;
    drop(outbound_tx);
    let _ = writer.await;
    debug!(connection = id, "websocket client disconnected");
}

async fn handle_client_message(
    manager: &BroadcastManager,
    id: ConnectionId,
    outbound: &mpsc::UnboundedSender<String>,
    text: &str,
) {
    let msg: ClientMessage = match serde_json::from_str(text) {
        Ok(msg) => msg,
        Err(e) => {
            send_control(
                outbound,
                &ServerMessage::Error {
                    message: format!("invalid message: {e}"),
                },
            );
            return;
        }
    };

    let reply = match msg {
        ClientMessage::Authenticate { wallet } => {
            match manager.authenticate(id, &wallet, Timestamp::now()).await {
                Ok(address) => ServerMessage::Authenticated {
                    wallet: address.to_string(),
                },
                Err(e) => error_reply(e),
            }
        }
        ClientMessage::JoinRoom { room } => {
            match manager.join_room(id, &room, Timestamp::now()).await {
                Ok(()) => ServerMessage::RoomJoined { room },
                Err(e) => error_reply(e),
            }
        }
        ClientMessage::LeaveRoom { room } => {
            match manager.leave_room(id, &room, Timestamp::now()).await {
                Ok(()) => ServerMessage::RoomLeft { room },
                Err(e) => error_reply(e),
            }
        }
        ClientMessage::Ping => ServerMessage::Pong,
    };
    send_control(outbound, &reply);
}

fn error_reply(e: RealtimeError) -> ServerMessage {
    ServerMessage::Error {
        message: e.to_string(),
    }
}

fn send_control(outbound: &mpsc::UnboundedSender<String>, msg: &ServerMessage) {
    if let Ok(text) = serde_json::to_string(msg) {
        let _ = outbound.send(text);
    }
}
