//! InkRoom WebSocket Relay
//!
//! Relays canvas messages between clients in the same room. A connection
//! joins one room at a time; everything it sends for that room is fanned
//! out to the other members, never echoed back.
//!
//! ## Protocol
//!
//! JSON text frames tagged by `type`:
//! ```json
//! { "type": "room:join", "room": "room-id", "userId": "ada" }
//! { "type": "canvas:draw", "room": "room-id", "data": { "id": "...", "type": "rectangle", ... } }
//! { "type": "canvas:erase", "room": "room-id", "shapeId": "..." }
//! { "type": "room:leave", "room": "room-id" }
//! ```
//! The relay itself sends `user:connected`, `user:disconnected` and
//! `error` notices.

use axum::{
    Json, Router,
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt, stream::SplitSink};
use inkroom_core::shapes::Shape;
use inkroom_core::storage::{CanvasStore, FileStore, MemoryStore, StorageError, StoredShape};
use inkroom_core::sync::WireMessage;
use std::{collections::HashMap, net::SocketAddr, path::PathBuf, sync::Arc};
use thiserror::Error;
use tokio::sync::broadcast::{self, error::RecvError};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const DEFAULT_BIND: &str = "0.0.0.0:3030";
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Relay startup errors.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Relay settings, read from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct RelayConfig {
    pub bind: SocketAddr,
    /// Directory for [`FileStore`]; in-memory store when absent.
    pub data_dir: Option<PathBuf>,
    /// Per-room broadcast buffer. Slower receivers skip what they missed.
    pub channel_capacity: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 3030)),
            data_dir: None,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl RelayConfig {
    /// Read `INKROOM_BIND`, `INKROOM_DATA_DIR` and `INKROOM_CHANNEL_CAPACITY`.
    pub fn from_env() -> Result<Self, RelayError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, RelayError> {
        let bind = lookup("INKROOM_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind = bind
            .parse()
            .map_err(|e| RelayError::Config(format!("INKROOM_BIND={bind}: {e}")))?;

        let channel_capacity = match lookup("INKROOM_CHANNEL_CAPACITY") {
            Some(raw) => match raw.parse::<usize>() {
                Ok(0) | Err(_) => {
                    return Err(RelayError::Config(format!(
                        "INKROOM_CHANNEL_CAPACITY={raw}: expected a positive integer"
                    )));
                }
                Ok(n) => n,
            },
            None => DEFAULT_CHANNEL_CAPACITY,
        };

        Ok(Self {
            bind,
            data_dir: lookup("INKROOM_DATA_DIR")
                .filter(|dir| !dir.is_empty())
                .map(PathBuf::from),
            channel_capacity,
        })
    }

    /// Open the configured store.
    pub fn open_store(&self) -> Result<Arc<dyn CanvasStore>, RelayError> {
        Ok(match &self.data_dir {
            Some(dir) => Arc::new(FileStore::new(dir.clone())?),
            None => Arc::new(MemoryStore::new()),
        })
    }
}

/// Live room state
struct Room {
    /// Broadcast channel: (sender peer id, encoded message)
    tx: broadcast::Sender<(String, String)>,
    /// Connected peers and the user id they joined with
    peers: HashMap<String, Option<String>>,
}

impl Room {
    fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            peers: HashMap::new(),
        }
    }
}

/// Shared application state
pub struct AppState {
    rooms: DashMap<String, Room>,
    store: Arc<dyn CanvasStore>,
    channel_capacity: usize,
}

impl AppState {
    pub fn new(store: Arc<dyn CanvasStore>, channel_capacity: usize) -> Self {
        Self {
            rooms: DashMap::new(),
            store,
            channel_capacity: channel_capacity.max(1),
        }
    }

    pub fn store(&self) -> &dyn CanvasStore {
        self.store.as_ref()
    }

    /// Number of live connections in a room.
    pub fn peer_count(&self, room_id: &str) -> usize {
        self.rooms.get(room_id).map_or(0, |room| room.peers.len())
    }

    pub fn has_room(&self, room_id: &str) -> bool {
        self.rooms.contains_key(room_id)
    }

    /// Add peer to room
    fn join_room(
        &self,
        room_id: &str,
        peer_id: &str,
        user_id: Option<String>,
    ) -> broadcast::Receiver<(String, String)> {
        let mut room = self
            .rooms
            .entry(room_id.to_string())
            .or_insert_with(|| Room::new(self.channel_capacity));
        room.peers.insert(peer_id.to_string(), user_id);
        room.tx.subscribe()
    }

    /// Remove peer from room, dropping the room once empty
    fn leave_room(&self, room_id: &str, peer_id: &str) {
        if let Some(mut room) = self.rooms.get_mut(room_id) {
            room.peers.remove(peer_id);
            if room.peers.is_empty() {
                drop(room);
                self.rooms.remove_if(room_id, |_, room| room.peers.is_empty());
                debug!("Room {} is empty, removed", room_id);
            }
        }
    }

    /// Broadcast message to room
    fn broadcast(&self, room_id: &str, from: &str, message: &WireMessage) {
        let json = match message.to_json() {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to encode message for room {}: {}", room_id, e);
                return;
            }
        };
        if let Some(room) = self.rooms.get(room_id) {
            // no receivers is fine
            let _ = room.tx.send((from.to_string(), json));
        }
    }
}

/// Build the relay router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/ws", get(ws_handler))
        .route("/rooms/{room}/shapes", get(room_shapes).post(seed_shape))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn serve(config: RelayConfig) -> Result<(), RelayError> {
    let store = config.open_store()?;
    match &config.data_dir {
        Some(dir) => info!("Persisting rooms under {}", dir.display()),
        None => info!("Using in-memory room store"),
    }
    let state = Arc::new(AppState::new(store, config.channel_capacity));

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    info!("InkRoom relay listening on {}", listener.local_addr()?);
    info!("WebSocket endpoint: ws://{}/ws", config.bind);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// Index page
async fn index() -> &'static str {
    "InkRoom Relay Server - Connect via WebSocket at /ws"
}

/// Health check
async fn health() -> &'static str {
    "ok"
}

/// Persisted shapes of a room, in paint order.
pub async fn room_shapes(
    Path(room): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Shape>>, (StatusCode, String)> {
    state
        .store
        .fetch_shapes(&room)
        .await
        .map(Json)
        .map_err(|e| {
            warn!("Failed to fetch shapes for room {}: {}", room, e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })
}

/// Seed a persisted shape row.
pub async fn seed_shape(
    Path(room): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(row): Json<StoredShape>,
) -> Result<StatusCode, (StatusCode, String)> {
    state
        .store
        .save_shape(&room, &row.user_id, &row.shape)
        .await
        .map(|()| StatusCode::CREATED)
        .map_err(|e| {
            warn!("Failed to save shape for room {}: {}", room, e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })
}

/// WebSocket upgrade handler
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Room the connection currently belongs to.
struct Membership {
    room: String,
    user_id: Option<String>,
}

async fn send_message(sender: &mut SplitSink<WebSocket, Message>, message: &WireMessage) -> bool {
    match message.to_json() {
        Ok(json) => sender.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            warn!("Failed to encode message: {}", e);
            true
        }
    }
}

fn error_notice(message: impl Into<String>) -> WireMessage {
    WireMessage::Error {
        message: message.into(),
    }
}

/// Handle a WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let peer_id = Uuid::new_v4().to_string();
    info!("New connection: {}", peer_id);

    let (mut sender, mut receiver) = socket.split();
    let mut membership: Option<Membership> = None;
    let mut room_rx: Option<broadcast::Receiver<(String, String)>> = None;

    loop {
        tokio::select! {
            // Handle incoming messages from client
            msg = receiver.next() => {
                let text = match msg {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => continue, // ping/pong and binary
                    Some(Err(e)) => {
                        warn!("WebSocket error for {}: {}", peer_id, e);
                        break;
                    }
                };

                let message = match WireMessage::from_json(text.as_str()) {
                    Ok(message) => message,
                    Err(e) => {
                        warn!("Invalid message from {}: {}", peer_id, e);
                        if !send_message(&mut sender, &error_notice(format!("Invalid message: {e}"))).await {
                            break;
                        }
                        continue;
                    }
                };

                match message {
                    WireMessage::Join { room, user_id } => {
                        // A connection sits in one room; switching is an ordinary disconnect
                        if let Some(old) = membership.take() {
                            disconnect(&state, &peer_id, old);
                        }
                        room_rx = Some(state.join_room(&room, &peer_id, user_id.clone()));
                        state.broadcast(&room, &peer_id, &WireMessage::UserConnected {
                            room: room.clone(),
                            user_id: user_id.clone(),
                        });
                        info!("Peer {} joined room {}", peer_id, room);
                        membership = Some(Membership { room, user_id });
                    }
                    WireMessage::Leave { room } => {
                        match membership.take() {
                            Some(current) if current.room == room => {
                                room_rx = None;
                                full_leave(&state, &peer_id, current).await;
                            }
                            other => {
                                membership = other;
                                if !send_message(&mut sender, &error_notice(format!("Not in room {room}"))).await {
                                    break;
                                }
                            }
                        }
                    }
                    message if message.is_canvas() => {
                        let joined = membership
                            .as_ref()
                            .is_some_and(|m| message.room() == Some(m.room.as_str()));
                        if joined {
                            if let Some(m) = &membership {
                                state.broadcast(&m.room, &peer_id, &message);
                            }
                        } else {
                            let room = message.room().unwrap_or_default();
                            debug!("Peer {} sent to unjoined room {}", peer_id, room);
                            if !send_message(&mut sender, &error_notice(format!("Not in room {room}"))).await {
                                break;
                            }
                        }
                    }
                    other => {
                        debug!("Ignoring relay notice from {}: {:?}", peer_id, other);
                    }
                }
            }

            // Handle broadcast messages from room
            msg = async {
                match &mut room_rx {
                    Some(rx) => Some(rx.recv().await),
                    None => std::future::pending().await,
                }
            } => {
                match msg {
                    Some(Ok((from, json))) => {
                        // Don't echo back to sender
                        if from != peer_id && sender.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    Some(Err(RecvError::Lagged(skipped))) => {
                        warn!("Peer {} lagged, skipped {} messages", peer_id, skipped);
                    }
                    Some(Err(RecvError::Closed)) | None => room_rx = None,
                }
            }
        }
    }

    // Cleanup on disconnect; persisted rows stay
    if let Some(current) = membership {
        disconnect(&state, &peer_id, current);
    }
    info!("Connection closed: {}", peer_id);
}

fn disconnect(state: &AppState, peer_id: &str, membership: Membership) {
    state.leave_room(&membership.room, peer_id);
    state.broadcast(&membership.room, peer_id, &WireMessage::UserDisconnected {
        room: membership.room.clone(),
        user_id: membership.user_id,
    });
    info!("Peer {} left room {}", peer_id, membership.room);
}

/// Leave for good: the user's stake in the persisted canvas goes too.
async fn full_leave(state: &AppState, peer_id: &str, membership: Membership) {
    if let Some(user) = &membership.user_id {
        if let Err(e) = state.store.leave_or_delete_canvas(&membership.room, user).await {
            warn!("Failed to release canvas {} for {}: {}", membership.room, user, e);
        }
    }
    disconnect(state, peer_id, membership);
}
