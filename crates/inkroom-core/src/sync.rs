//! Wire protocol and WebSocket client for collaboration.
//!
//! Every message is a JSON object tagged by `type`. Canvas messages carry
//! whole shape snapshots; there are no versions or clocks, so the last
//! message applied for an id wins.

use crate::canvas::CanvasDocument;
use crate::shapes::{Shape, ShapeId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Messages exchanged between clients and the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WireMessage {
    #[serde(rename = "room:join")]
    Join {
        room: String,
        #[serde(rename = "userId", default, skip_serializing_if = "Option::is_none")]
        user_id: Option<String>,
    },
    #[serde(rename = "room:leave")]
    Leave { room: String },
    #[serde(rename = "canvas:draw")]
    Draw { room: String, data: Shape },
    #[serde(rename = "canvas:update")]
    Update { room: String, data: Shape },
    #[serde(rename = "canvas:erase")]
    Erase {
        room: String,
        #[serde(rename = "shapeId")]
        shape_id: ShapeId,
    },
    #[serde(rename = "canvas:clear")]
    Clear { room: String },
    /// Relay notice: a peer joined the room.
    #[serde(rename = "user:connected")]
    UserConnected {
        room: String,
        #[serde(rename = "userId", default, skip_serializing_if = "Option::is_none")]
        user_id: Option<String>,
    },
    /// Relay notice: a peer left the room or dropped.
    #[serde(rename = "user:disconnected")]
    UserDisconnected {
        room: String,
        #[serde(rename = "userId", default, skip_serializing_if = "Option::is_none")]
        user_id: Option<String>,
    },
    #[serde(rename = "error")]
    Error { message: String },
}

impl WireMessage {
    /// Room named by the message, if any.
    pub fn room(&self) -> Option<&str> {
        match self {
            WireMessage::Join { room, .. }
            | WireMessage::Leave { room }
            | WireMessage::Draw { room, .. }
            | WireMessage::Update { room, .. }
            | WireMessage::Erase { room, .. }
            | WireMessage::Clear { room }
            | WireMessage::UserConnected { room, .. }
            | WireMessage::UserDisconnected { room, .. } => Some(room),
            WireMessage::Error { .. } => None,
        }
    }

    /// Whether the message mutates the shape list.
    pub fn is_canvas(&self) -> bool {
        matches!(
            self,
            WireMessage::Draw { .. }
                | WireMessage::Update { .. }
                | WireMessage::Erase { .. }
                | WireMessage::Clear { .. }
        )
    }

    pub fn to_json(&self) -> Result<String, SyncError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, SyncError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Apply an inbound message to the local shape list.
///
/// Returns true if the list changed. Notices never touch the list.
pub fn apply(canvas: &mut CanvasDocument, message: &WireMessage) -> bool {
    match message {
        WireMessage::Draw { data, .. } => {
            canvas.add_shape(data.clone());
            true
        }
        WireMessage::Update { data, .. } => canvas.update_shape(data) > 0,
        WireMessage::Erase { shape_id, .. } => canvas.remove_shape(*shape_id) > 0,
        WireMessage::Clear { .. } => {
            let changed = !canvas.is_empty();
            canvas.clear();
            changed
        }
        WireMessage::Join { .. }
        | WireMessage::Leave { .. }
        | WireMessage::UserConnected { .. }
        | WireMessage::UserDisconnected { .. }
        | WireMessage::Error { .. } => false,
    }
}

/// Errors from the sync transport and codec.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("not connected")]
    NotConnected,
    #[error("already connected")]
    AlreadyConnected,
    #[error("invalid WebSocket URL: {0}")]
    InvalidUrl(String),
    #[error("send failed: {0}")]
    Send(String),
    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),
}

/// Outbound text channel to the relay.
pub trait Transport {
    fn send(&mut self, text: String) -> Result<(), SyncError>;
}

/// Transport that queues outgoing JSON for the host to drain.
#[derive(Debug, Clone, Default)]
pub struct Outbox {
    outgoing: Vec<String>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take all pending outgoing messages.
    pub fn take_outgoing(&mut self) -> Vec<String> {
        std::mem::take(&mut self.outgoing)
    }

    pub fn pending(&self) -> &[String] {
        &self.outgoing
    }
}

impl Transport for Outbox {
    fn send(&mut self, text: String) -> Result<(), SyncError> {
        self.outgoing.push(text);
        Ok(())
    }
}

/// Builds messages for one room and sends them fire-and-forget.
#[derive(Debug)]
pub struct SyncClient<T: Transport> {
    room: String,
    user_id: Option<String>,
    transport: T,
}

impl<T: Transport> SyncClient<T> {
    pub fn new(room: impl Into<String>, transport: T) -> Self {
        Self {
            room: room.into(),
            user_id: None,
            transport,
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn room(&self) -> &str {
        &self.room
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Send a message. Failures are logged and swallowed.
    pub fn send(&mut self, message: &WireMessage) -> bool {
        let text = match message.to_json() {
            Ok(text) => text,
            Err(e) => {
                log::error!("Failed to encode message: {}", e);
                return false;
            }
        };
        match self.transport.send(text) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Dropping outgoing message: {}", e);
                false
            }
        }
    }

    pub fn join(&mut self) -> bool {
        let message = WireMessage::Join {
            room: self.room.clone(),
            user_id: self.user_id.clone(),
        };
        self.send(&message)
    }

    pub fn leave(&mut self) -> bool {
        let message = WireMessage::Leave {
            room: self.room.clone(),
        };
        self.send(&message)
    }

    pub fn draw(&mut self, shape: &Shape) -> bool {
        let message = WireMessage::Draw {
            room: self.room.clone(),
            data: shape.clone(),
        };
        self.send(&message)
    }

    pub fn update(&mut self, shape: &Shape) -> bool {
        let message = WireMessage::Update {
            room: self.room.clone(),
            data: shape.clone(),
        };
        self.send(&message)
    }

    pub fn erase(&mut self, shape_id: ShapeId) -> bool {
        let message = WireMessage::Erase {
            room: self.room.clone(),
            shape_id,
        };
        self.send(&message)
    }

    pub fn clear(&mut self) -> bool {
        let message = WireMessage::Clear {
            room: self.room.clone(),
        };
        self.send(&message)
    }
}

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

/// Events from the WebSocket client
#[derive(Debug, Clone)]
pub enum SyncEvent {
    Connected,
    Disconnected,
    /// A decoded message from the relay.
    Message(WireMessage),
    Error { message: String },
}

#[cfg(not(target_arch = "wasm32"))]
mod native_client {
    use super::*;
    use std::sync::mpsc::{Receiver, Sender, TryRecvError, channel};
    use std::thread::{self, JoinHandle};
    use std::time::Duration;
    use tungstenite::{Message, connect};
    use url::Url;

    /// Commands sent to the WebSocket thread.
    enum WsCommand {
        Send(String),
        Close,
    }

    /// WebSocket client for native platforms.
    ///
    /// Uses a background thread for non-blocking operation; inbound messages
    /// are collected and must be polled via `poll_events()`.
    pub struct NativeWebSocket {
        state: ConnectionState,
        events: Vec<SyncEvent>,
        /// Channel to send commands to the WebSocket thread.
        cmd_tx: Option<Sender<WsCommand>>,
        /// Channel to receive events from the WebSocket thread.
        event_rx: Option<Receiver<SyncEvent>>,
        _thread: Option<JoinHandle<()>>,
    }

    impl NativeWebSocket {
        /// Create a new disconnected WebSocket client.
        pub fn new() -> Self {
            Self {
                state: ConnectionState::Disconnected,
                events: Vec::new(),
                cmd_tx: None,
                event_rx: None,
                _thread: None,
            }
        }

        /// Connect to a relay's `/ws` endpoint.
        pub fn connect(&mut self, url: &str) -> Result<(), SyncError> {
            if self.cmd_tx.is_some() {
                return Err(SyncError::AlreadyConnected);
            }

            let parsed_url = Url::parse(url).map_err(|e| SyncError::InvalidUrl(e.to_string()))?;
            if parsed_url.scheme() != "ws" && parsed_url.scheme() != "wss" {
                return Err(SyncError::InvalidUrl(format!(
                    "unsupported scheme: {}",
                    parsed_url.scheme()
                )));
            }

            self.state = ConnectionState::Connecting;

            let (cmd_tx, cmd_rx) = channel::<WsCommand>();
            let (event_tx, event_rx) = channel::<SyncEvent>();

            let url = url.to_string();

            let handle = thread::spawn(move || {
                log::info!("WebSocket thread: connecting to {}", url);

                let (mut socket, response) = match connect(&url) {
                    Ok(connected) => connected,
                    Err(e) => {
                        log::error!("WebSocket connection failed: {}", e);
                        let _ = event_tx.send(SyncEvent::Error {
                            message: format!("Connection failed: {}", e),
                        });
                        return;
                    }
                };
                log::info!("WebSocket connected, status: {}", response.status());
                let _ = event_tx.send(SyncEvent::Connected);

                // A short read timeout turns the blocking read into a poll.
                match socket.get_mut() {
                    tungstenite::stream::MaybeTlsStream::Plain(tcp) => {
                        let _ = tcp.set_read_timeout(Some(Duration::from_millis(50)));
                        let _ = tcp.set_write_timeout(Some(Duration::from_secs(5)));
                    }
                    #[allow(unreachable_patterns)]
                    _ => {
                        log::debug!("TLS or other stream - using default timeout handling");
                    }
                }

                loop {
                    match cmd_rx.try_recv() {
                        Ok(WsCommand::Send(msg)) => {
                            log::debug!("WebSocket sending {} bytes", msg.len());
                            if let Err(e) = socket.send(Message::Text(msg)) {
                                log::error!("WebSocket send error: {}", e);
                                break;
                            }
                        }
                        Ok(WsCommand::Close) => {
                            log::info!("WebSocket close requested");
                            let _ = socket.close(None);
                            break;
                        }
                        Err(TryRecvError::Disconnected) => {
                            log::info!("WebSocket command channel disconnected");
                            break;
                        }
                        Err(TryRecvError::Empty) => {}
                    }

                    match socket.read() {
                        Ok(Message::Text(txt)) => match WireMessage::from_json(&txt) {
                            Ok(message) => {
                                let _ = event_tx.send(SyncEvent::Message(message));
                            }
                            Err(e) => {
                                log::warn!("Failed to parse relay message ({}): {}", e, txt);
                            }
                        },
                        Ok(Message::Ping(data)) => {
                            let _ = socket.send(Message::Pong(data));
                        }
                        Ok(Message::Close(_)) => {
                            log::info!("WebSocket received close frame");
                            break;
                        }
                        Ok(_) => {}
                        Err(tungstenite::Error::Io(ref e))
                            if e.kind() == std::io::ErrorKind::WouldBlock
                                || e.kind() == std::io::ErrorKind::TimedOut =>
                        {
                            continue;
                        }
                        Err(e) => {
                            log::error!("WebSocket read error: {}", e);
                            break;
                        }
                    }
                }

                log::info!("WebSocket thread exiting");
                let _ = event_tx.send(SyncEvent::Disconnected);
            });

            self.cmd_tx = Some(cmd_tx);
            self.event_rx = Some(event_rx);
            self._thread = Some(handle);

            Ok(())
        }

        /// Disconnect from the server.
        pub fn disconnect(&mut self) {
            if let Some(tx) = self.cmd_tx.take() {
                let _ = tx.send(WsCommand::Close);
            }
            self.event_rx = None;
            self._thread = None;
            self.state = ConnectionState::Disconnected;
        }

        /// Poll for pending events (non-blocking).
        pub fn poll_events(&mut self) -> Vec<SyncEvent> {
            if let Some(ref rx) = self.event_rx {
                while let Ok(event) = rx.try_recv() {
                    match &event {
                        SyncEvent::Connected => self.state = ConnectionState::Connected,
                        SyncEvent::Disconnected => self.state = ConnectionState::Disconnected,
                        SyncEvent::Error { .. } => self.state = ConnectionState::Error,
                        SyncEvent::Message(_) => {}
                    }
                    self.events.push(event);
                }
            }

            std::mem::take(&mut self.events)
        }

        pub fn state(&self) -> ConnectionState {
            self.state
        }

        pub fn is_connected(&self) -> bool {
            self.state == ConnectionState::Connected
        }
    }

    impl Transport for NativeWebSocket {
        fn send(&mut self, text: String) -> Result<(), SyncError> {
            let tx = self.cmd_tx.as_ref().ok_or(SyncError::NotConnected)?;
            tx.send(WsCommand::Send(text))
                .map_err(|e| SyncError::Send(e.to_string()))
        }
    }

    impl Default for NativeWebSocket {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Drop for NativeWebSocket {
        fn drop(&mut self) {
            self.disconnect();
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub use native_client::NativeWebSocket;
