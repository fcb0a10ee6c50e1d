// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Transport abstraction for WebSocket communication.
//!
//! The connection state machine never blocks on the socket. A transport
//! starts opening, sending and closing, and reports what happened later as
//! [`TransportEvent`]s fed back into the connection. This keeps the state
//! machine testable with a recording mock, and lets the production
//! transport run its socket I/O on background tasks.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Close code for a deliberate, client-initiated disconnect.
pub const CLOSE_NORMAL: u16 = 1000;
/// Close code used when the network went away.
pub const CLOSE_GOING_AWAY: u16 = 1001;
/// Close code used after the server rejected our credentials.
pub const CLOSE_POLICY_VIOLATION: u16 = 1008;
/// Reported when the peer vanished without a close frame.
pub const CLOSE_ABNORMAL: u16 = 1006;
/// Reported when a close frame carried no status.
pub const CLOSE_NO_STATUS: u16 = 1005;

/// Error type for transport operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Connection could not be started.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// No open connection to write to.
    #[error("connection closed")]
    ConnectionClosed,

    /// Send failed.
    #[error("send failed: {0}")]
    SendFailed(String),
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Something that happened on the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The socket finished opening.
    Opened,
    /// A text frame arrived.
    Message(String),
    /// The socket closed.
    Closed { code: u16, reason: String },
    /// The socket failed.
    Error(String),
    /// Frames accepted by `send` that never reached the socket. Always
    /// reported right before the `Closed` or `Error` of the same socket.
    Unsent(Vec<String>),
}

/// Non-blocking WebSocket-like transport.
///
/// `send` only hands a frame over. A frame that is still unwritten when the
/// socket dies comes back as [`TransportEvent::Unsent`].
pub trait Transport: Send {
    /// Start opening a connection to `url`, replacing any previous one.
    ///
    /// Completion is reported as [`TransportEvent::Opened`], failure as
    /// [`TransportEvent::Error`] or [`TransportEvent::Closed`]. An error
    /// return means the attempt could not even be started.
    fn open(&mut self, url: &str) -> TransportResult<()>;

    /// Queue a text frame on the open connection.
    fn send(&mut self, frame: &str) -> TransportResult<()>;

    /// Close the connection. Closing an already closed transport is a no-op.
    fn close(&mut self, code: u16, reason: &str);
}

/// A transport event tagged with the connection generation it came from.
pub type TaggedEvent = (u64, TransportEvent);

enum Outbound {
    Frame(String),
    Close { code: u16, reason: String },
}

/// WebSocket transport implementation using tokio-tungstenite.
///
/// Each `open` spawns one task owning the socket. Events go out on the
/// channel given to [`WebSocketTransport::new`], tagged with a generation
/// number that changes on every open and close, so the receiver can drop
/// events from sockets it no longer cares about.
pub struct WebSocketTransport {
    events: mpsc::UnboundedSender<TaggedEvent>,
    generation: u64,
    outbound: Option<mpsc::UnboundedSender<Outbound>>,
    task: Option<JoinHandle<()>>,
}

impl WebSocketTransport {
    /// Create a transport reporting to `events`.
    pub fn new(events: mpsc::UnboundedSender<TaggedEvent>) -> Self {
        WebSocketTransport { events, generation: 0, outbound: None, task: None }
    }

    /// Generation of the current socket. Events with another tag are stale.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Transport for WebSocketTransport {
    fn open(&mut self, url: &str) -> TransportResult<()> {
        if !(url.starts_with("ws://") || url.starts_with("wss://")) {
            return Err(TransportError::ConnectionFailed(format!("not a websocket url: {}", url)));
        }
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.generation += 1;

        let (tx, rx) = mpsc::unbounded_channel();
        self.outbound = Some(tx);
        self.task =
            Some(runtime.spawn(run_socket(url.to_string(), self.generation, rx, self.events.clone())));
        Ok(())
    }

    fn send(&mut self, frame: &str) -> TransportResult<()> {
        let outbound = self.outbound.as_ref().ok_or(TransportError::ConnectionClosed)?;
        outbound
            .send(Outbound::Frame(frame.to_string()))
            .map_err(|_| TransportError::ConnectionClosed)
    }

    fn close(&mut self, code: u16, reason: &str) {
        // The socket task finishes the close handshake on its own; anything
        // it reports afterwards carries the old generation.
        if let Some(outbound) = self.outbound.take() {
            let _ = outbound.send(Outbound::Close { code, reason: reason.to_string() });
            self.generation += 1;
        }
        self.task = None;
    }
}

async fn run_socket(
    url: String,
    generation: u64,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    events: mpsc::UnboundedSender<TaggedEvent>,
) {
    use futures_util::{SinkExt, StreamExt};
    use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
    use tokio_tungstenite::tungstenite::protocol::CloseFrame;
    use tokio_tungstenite::tungstenite::Message;

    let emit = |event: TransportEvent| {
        let _ = events.send((generation, event));
    };

    let ws_stream = match tokio_tungstenite::connect_async(url.as_str()).await {
        Ok((ws_stream, _)) => ws_stream,
        Err(e) => {
            let unsent = drain_unsent(&mut outbound, None);
            hand_back(&emit, unsent);
            emit(TransportEvent::Error(e.to_string()));
            return;
        }
    };
    emit(TransportEvent::Opened);

    let (mut sink, mut stream) = ws_stream.split();
    let mut failed = None;
    let lost = loop {
        tokio::select! {
            // Notice a dead peer before writing into it
            biased;

            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    emit(TransportEvent::Message(text.as_str().to_string()));
                }
                Some(Ok(Message::Close(frame))) => {
                    let (code, reason) = match frame {
                        Some(frame) => (u16::from(frame.code), frame.reason.as_str().to_string()),
                        None => (CLOSE_NO_STATUS, String::new()),
                    };
                    break Some(TransportEvent::Closed { code, reason });
                }
                Some(Ok(_)) => {
                    // Ping/pong are answered by tungstenite; binary frames are not part of the protocol
                }
                Some(Err(e)) => break Some(TransportEvent::Error(e.to_string())),
                None => {
                    break Some(TransportEvent::Closed {
                        code: CLOSE_ABNORMAL,
                        reason: "stream ended".to_string(),
                    });
                }
            },
            command = outbound.recv() => match command {
                Some(Outbound::Frame(text)) => {
                    if let Err(e) = sink.send(Message::Text(text.clone().into())).await {
                        failed = Some(text);
                        break Some(TransportEvent::Error(e.to_string()));
                    }
                }
                Some(Outbound::Close { code, reason }) => {
                    let frame = CloseFrame { code: CloseCode::from(code), reason: reason.into() };
                    let _ = sink.send(Message::Close(Some(frame))).await;
                    break None;
                }
                None => {
                    let _ = sink.close().await;
                    break None;
                }
            },
        }
    };

    if let Some(event) = lost {
        let unsent = drain_unsent(&mut outbound, failed);
        hand_back(&emit, unsent);
        emit(event);
    }
}

/// Stops accepting frames and collects every frame that never reached the
/// socket, oldest first.
fn drain_unsent(
    outbound: &mut mpsc::UnboundedReceiver<Outbound>,
    failed: Option<String>,
) -> Vec<String> {
    // Later sends fail synchronously instead of landing here
    outbound.close();

    let mut unsent: Vec<String> = failed.into_iter().collect();
    while let Ok(command) = outbound.try_recv() {
        if let Outbound::Frame(text) = command {
            unsent.push(text);
        }
    }
    unsent
}

fn hand_back(emit: &impl Fn(TransportEvent), unsent: Vec<String>) {
    if !unsent.is_empty() {
        emit(TransportEvent::Unsent(unsent));
    }
}
