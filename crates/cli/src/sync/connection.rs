// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The sync connection state machine.
//!
//! A [`SyncConnection`] owns one logical session with the sync server:
//!
//! ```text
//!  Idle ──connect──► Connecting ──opened──► Authenticating ──auth_success──► Connected
//!                        ▲                        │                              │
//!                        │                        │ auth_error / close / error   │
//!                        └──reconnect timer── Reconnecting ◄─────────────────────┘
//!
//!  any state ──disconnect──► Closed
//! ```
//!
//! It does no I/O of its own: socket activity arrives through
//! [`SyncConnection::handle_transport_event`], fired timers through
//! [`SyncConnection::handle_timer`], and reachability changes through
//! [`SyncConnection::network_down`] and [`SyncConnection::network_up`].
//! All methods must be called from one logical thread of control.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Map, Value};
use ul_core::protocol::{AppMessage, ClientMessage, KIND_CLIPBOARD_SYNC, KIND_DEVICE_STATUS, KIND_FILE_TRANSFER};
use ul_core::{DeviceIdentity, InboundEvent, Priority, ProtocolError};

use super::auth::AuthTokenProvider;
use super::backoff::{ReconnectPolicy, DEFAULT_BASE_DELAY, DEFAULT_MAX_DELAY};
use super::queue::{OutboundMessage, PendingQueue, DEFAULT_QUEUE_CAPACITY};
use super::scheduler::{Scheduler, TimerKind};
use super::transport::{
    Transport, TransportError, TransportEvent, TransportResult, CLOSE_GOING_AWAY, CLOSE_NORMAL,
    CLOSE_POLICY_VIOLATION,
};

/// Default keepalive period.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_millis(30_000);

/// Tunables for a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSettings {
    pub reconnect_base_delay: Duration,
    pub reconnect_max_delay: Duration,
    pub heartbeat_interval: Duration,
    pub queue_capacity: usize,
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            reconnect_base_delay: DEFAULT_BASE_DELAY,
            reconnect_max_delay: DEFAULT_MAX_DELAY,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// Lifecycle state of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// Never connected.
    Idle,
    /// Transport is opening.
    Connecting,
    /// Transport is open, waiting for the server to accept the handshake.
    Authenticating,
    /// Handshake accepted; messages flow.
    Connected,
    /// Waiting to retry, or waiting for the network to come back.
    Reconnecting,
    /// Closed by the caller. Only `connect` leaves this state.
    Closed,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Authenticating => "authenticating",
            ConnectionState::Connected => "connected",
            ConnectionState::Reconnecting => "reconnecting",
            ConnectionState::Closed => "closed",
        }
    }

    /// True while a transport is open or opening.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            ConnectionState::Connecting | ConnectionState::Authenticating | ConnectionState::Connected
        )
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a connection for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    pub state: ConnectionState,
    pub queue_depth: usize,
    pub high_priority_queue_depth: usize,
    pub last_successful_sync_at: Option<DateTime<Utc>>,
    pub reconnect_attempts: u32,
}

type EventHandler = Box<dyn FnMut(&InboundEvent) + Send>;
type StateHandler = Box<dyn FnMut(ConnectionState, ConnectionState) + Send>;

/// Where to connect and as whom; remembered for reconnects.
#[derive(Debug, Clone)]
struct Target {
    endpoint: String,
    identity: DeviceIdentity,
}

/// One logical session with the sync server.
pub struct SyncConnection<T: Transport, S: Scheduler, A: AuthTokenProvider> {
    transport: T,
    scheduler: S,
    auth: A,
    settings: SyncSettings,
    state: ConnectionState,
    target: Option<Target>,
    queue: PendingQueue,
    policy: ReconnectPolicy,
    online: bool,
    last_sync_at: Option<DateTime<Utc>>,
    event_handlers: Vec<EventHandler>,
    state_handlers: Vec<StateHandler>,
}

impl<T: Transport, S: Scheduler, A: AuthTokenProvider> SyncConnection<T, S, A> {
    pub fn new(transport: T, scheduler: S, auth: A, settings: SyncSettings) -> Self {
        SyncConnection {
            transport,
            scheduler,
            auth,
            queue: PendingQueue::new(settings.queue_capacity),
            policy: ReconnectPolicy::new(settings.reconnect_base_delay, settings.reconnect_max_delay),
            settings,
            state: ConnectionState::Idle,
            target: None,
            online: true,
            last_sync_at: None,
            event_handlers: Vec::new(),
            state_handlers: Vec::new(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_online(&self) -> bool {
        self.online
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    /// Messages waiting for a connection, in transmission order.
    pub fn pending(&self) -> &PendingQueue {
        &self.queue
    }

    /// Identity of the current or last session.
    pub fn identity(&self) -> Option<&DeviceIdentity> {
        self.target.as_ref().map(|t| &t.identity)
    }

    pub fn stats(&self) -> SyncStats {
        SyncStats {
            state: self.state,
            queue_depth: self.queue.len(),
            high_priority_queue_depth: self.queue.count(Priority::High),
            last_successful_sync_at: self.last_sync_at,
            reconnect_attempts: self.policy.attempt(),
        }
    }

    /// Register a handler for every inbound event.
    pub fn on_event<F>(&mut self, handler: F)
    where
        F: FnMut(&InboundEvent) + Send + 'static,
    {
        self.event_handlers.push(Box::new(handler));
    }

    /// Register a handler called with `(old, new)` on every state change.
    pub fn on_state_change<F>(&mut self, handler: F)
    where
        F: FnMut(ConnectionState, ConnectionState) + Send + 'static,
    {
        self.state_handlers.push(Box::new(handler));
    }

    /// Start a session with `endpoint`.
    ///
    /// Does nothing while a session is already connecting or connected.
    /// Failures are never returned; they surface as state changes and
    /// scheduled reconnects.
    pub fn connect(&mut self, endpoint: &str, identity: DeviceIdentity) {
        if self.state.is_active() {
            tracing::debug!("connect ignored while {}", self.state);
            return;
        }

        self.target = Some(Target { endpoint: endpoint.to_string(), identity });
        self.scheduler.cancel(TimerKind::Reconnect);

        if !self.online {
            tracing::info!("network offline, deferring connection to {}", endpoint);
            self.set_state(ConnectionState::Reconnecting);
            return;
        }
        self.open_transport();
    }

    /// Returns a guard that disconnects when dropped.
    pub fn session(&mut self) -> Session<'_, T, S, A> {
        Session { connection: self }
    }

    /// Close the session and stop reconnecting. Queued messages are kept.
    pub fn disconnect(&mut self) {
        self.scheduler.cancel(TimerKind::Heartbeat);
        self.scheduler.cancel(TimerKind::Reconnect);
        if self.state.is_active() {
            self.transport.close(CLOSE_NORMAL, "client disconnect");
        }
        self.set_state(ConnectionState::Closed);
    }

    /// Send an application message, or queue it until the session is up.
    ///
    /// A payload that is not a JSON object is wrapped as `{"value": payload}`.
    pub fn send(&mut self, kind: &str, payload: Value, priority: Priority) {
        let message =
            OutboundMessage::new(kind, into_object(payload), priority, self.scheduler.now_ms());

        if self.state == ConnectionState::Connected {
            match self.transmit(&message) {
                Ok(()) => return,
                Err(e) => tracing::warn!("send of {} failed, queueing: {}", kind, e),
            }
        }
        self.enqueue(message);
    }

    /// Share clipboard contents with the user's other devices.
    pub fn sync_clipboard(&mut self, content: &str, content_type: &str) {
        let mut payload = json!({ "content": content, "contentType": content_type });
        self.add_device_name(&mut payload);
        self.send(KIND_CLIPBOARD_SYNC, payload, Priority::High);
    }

    /// Report progress of a file transfer. `transfer` carries the transfer
    /// fields (`transferId`, `fileName`, `status`, `progress`).
    pub fn sync_file_transfer(&mut self, transfer: Value) {
        let mut payload = Value::Object(into_object(transfer));
        self.add_device_name(&mut payload);
        self.send(KIND_FILE_TRANSFER, payload, Priority::Medium);
    }

    /// Announce this device's presence.
    pub fn sync_device_status(&mut self, status: &str) {
        let mut payload = json!({ "status": status });
        if let (Some(identity), Some(map)) = (self.identity(), payload.as_object_mut()) {
            map.insert("deviceType".to_string(), json!(identity.device_info.device_type));
            map.insert("platform".to_string(), json!(identity.device_info.platform));
        }
        self.add_device_name(&mut payload);
        self.send(KIND_DEVICE_STATUS, payload, Priority::Low);
    }

    /// The network became unreachable.
    ///
    /// Drops the socket and holds off reconnecting until [`network_up`].
    ///
    /// [`network_up`]: SyncConnection::network_up
    pub fn network_down(&mut self) {
        if !self.online {
            return;
        }
        self.online = false;
        tracing::info!("network down");

        self.scheduler.cancel(TimerKind::Reconnect);
        self.scheduler.cancel(TimerKind::Heartbeat);
        if self.state.is_active() {
            self.transport.close(CLOSE_GOING_AWAY, "network offline");
            self.set_state(ConnectionState::Reconnecting);
        }
    }

    /// The network is reachable again; retry immediately if we were waiting.
    pub fn network_up(&mut self) {
        if self.online {
            return;
        }
        self.online = true;
        tracing::info!("network up");

        if self.state == ConnectionState::Reconnecting {
            self.scheduler.cancel(TimerKind::Reconnect);
            self.open_transport();
        }
    }

    /// Feed a socket event into the state machine.
    pub fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Opened => self.on_opened(),
            TransportEvent::Message(text) => self.on_message(&text),
            TransportEvent::Closed { code, reason } => {
                self.on_transport_lost(&format!("closed with code {} {}", code, reason))
            }
            TransportEvent::Error(e) => self.on_transport_lost(&format!("error: {}", e)),
            TransportEvent::Unsent(frames) => self.on_unsent(frames),
        }
    }

    /// Feed a fired timer into the state machine.
    pub fn handle_timer(&mut self, timer: TimerKind) {
        match timer {
            TimerKind::Reconnect => {
                if self.state == ConnectionState::Reconnecting && self.online {
                    self.open_transport();
                } else {
                    tracing::debug!("stale reconnect timer in state {}", self.state);
                }
            }
            TimerKind::Heartbeat => {
                if self.state == ConnectionState::Connected {
                    self.send_heartbeat();
                } else {
                    tracing::debug!("stale heartbeat timer in state {}", self.state);
                }
            }
        }
    }

    fn open_transport(&mut self) {
        let Some(endpoint) = self.target.as_ref().map(|t| t.endpoint.clone()) else {
            return;
        };

        self.set_state(ConnectionState::Connecting);
        tracing::info!("connecting to {} (attempt {})", endpoint, self.policy.attempt());
        if let Err(e) = self.transport.open(&endpoint) {
            self.schedule_reconnect(&e.to_string());
        }
    }

    fn on_opened(&mut self) {
        if self.state != ConnectionState::Connecting {
            tracing::debug!("ignoring open event in state {}", self.state);
            return;
        }
        let Some(identity) = self.target.as_ref().map(|t| t.identity.clone()) else {
            return;
        };

        self.set_state(ConnectionState::Authenticating);
        let handshake = ClientMessage::auth(self.auth.current_token(), &identity);
        if let Err(e) = self.send_control(&handshake) {
            self.transport.close(CLOSE_GOING_AWAY, "handshake failed");
            self.schedule_reconnect(&format!("handshake failed: {}", e));
        }
    }

    fn on_message(&mut self, text: &str) {
        if !matches!(self.state, ConnectionState::Authenticating | ConnectionState::Connected) {
            tracing::debug!("ignoring message in state {}", self.state);
            return;
        }

        let event = match InboundEvent::from_json(text) {
            Ok(event) => event,
            Err(ProtocolError::UnknownType(kind)) => {
                tracing::debug!("ignoring message of unknown type {}", kind);
                return;
            }
            Err(e) => {
                tracing::warn!("discarding malformed message: {}", e);
                return;
            }
        };

        match &event {
            InboundEvent::AuthSuccess => self.on_auth_success(),
            InboundEvent::AuthError { message } => {
                let reason = message.as_deref().unwrap_or("authentication rejected").to_string();
                tracing::warn!("authentication failed: {}", reason);
                self.transport.close(CLOSE_POLICY_VIOLATION, "authentication failed");
                self.schedule_reconnect(&reason);
            }
            InboundEvent::SyncComplete => {
                self.last_sync_at = Some(self.scheduler.now_utc());
            }
            InboundEvent::Error { message } => tracing::warn!("server error: {}", message),
            _ => {}
        }
        self.dispatch(&event);
    }

    fn on_auth_success(&mut self) {
        if self.state != ConnectionState::Authenticating {
            tracing::debug!("ignoring auth_success in state {}", self.state);
            return;
        }

        self.policy.reset();
        self.last_sync_at = Some(self.scheduler.now_utc());
        self.set_state(ConnectionState::Connected);
        self.scheduler.set_interval(TimerKind::Heartbeat, self.settings.heartbeat_interval);
        self.flush_queue();
    }

    fn on_transport_lost(&mut self, reason: &str) {
        if !self.state.is_active() {
            tracing::debug!("ignoring transport {} in state {}", reason, self.state);
            return;
        }
        self.schedule_reconnect(reason);
    }

    fn schedule_reconnect(&mut self, reason: &str) {
        self.scheduler.cancel(TimerKind::Heartbeat);
        self.scheduler.cancel(TimerKind::Reconnect);

        if !self.online {
            tracing::info!("connection lost ({}), waiting for network", reason);
            self.set_state(ConnectionState::Reconnecting);
            return;
        }

        let delay = self.policy.next_delay();
        self.scheduler.set_timeout(TimerKind::Reconnect, delay);
        self.set_state(ConnectionState::Reconnecting);
        tracing::info!(
            "connection lost ({}), reconnecting in {}ms (attempt {})",
            reason,
            delay.as_millis(),
            self.policy.attempt()
        );
    }

    fn send_heartbeat(&mut self) {
        let Some(device_id) = self.identity().map(|i| i.device_id.clone()) else {
            return;
        };
        let heartbeat = ClientMessage::heartbeat(self.scheduler.now_ms(), device_id);
        if let Err(e) = self.send_control(&heartbeat) {
            tracing::warn!("heartbeat failed: {}", e);
        }
    }

    fn send_control(&mut self, message: &ClientMessage) -> TransportResult<()> {
        let frame = message.to_json().map_err(|e| TransportError::SendFailed(e.to_string()))?;
        self.transport.send(&frame)
    }

    /// Wire frame for a queued message, stamped with the current time.
    fn frame_for(&self, message: &OutboundMessage) -> TransportResult<String> {
        let device_id = self.identity().map(|i| i.device_id.as_str()).unwrap_or_default();
        let app = AppMessage::new(
            message.kind.clone(),
            &message.payload,
            device_id,
            self.scheduler.now_ms(),
            message.priority,
        );
        ClientMessage::app(app).to_json().map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    fn transmit(&mut self, message: &OutboundMessage) -> TransportResult<()> {
        let frame = self.frame_for(message)?;
        self.transport.send(&frame)
    }

    fn enqueue(&mut self, message: OutboundMessage) {
        let evicted = self.queue.push(message);
        self.log_eviction(evicted);
    }

    fn log_eviction(&self, evicted: Option<OutboundMessage>) {
        if let Some(evicted) = evicted {
            tracing::warn!(
                "pending queue full ({} messages), dropped {} message {}",
                self.queue.capacity(),
                evicted.priority,
                evicted.kind
            );
        }
    }

    /// Put frames the socket never wrote back in the queue, ahead of newer
    /// messages of the same priority. Control frames are not retried.
    fn on_unsent(&mut self, frames: Vec<String>) {
        let mut requeued = 0;
        for frame in frames.iter().rev() {
            let Some(message) = self.recover(frame) else {
                continue;
            };
            let evicted = self.queue.requeue(message);
            self.log_eviction(evicted);
            requeued += 1;
        }
        if requeued > 0 {
            tracing::info!("Re-queued {} unsent messages", requeued);
        }
    }

    /// The queued form of an application frame built by `frame_for`.
    fn recover(&self, frame: &str) -> Option<OutboundMessage> {
        let app = match ClientMessage::from_json(frame) {
            Ok(ClientMessage::App(app)) => app,
            Ok(ClientMessage::Control(_)) => return None,
            Err(e) => {
                tracing::warn!("dropping unreadable unsent frame: {}", e);
                return None;
            }
        };

        let mut payload = app.data;
        let priority = payload
            .remove("priority")
            .and_then(|p| p.as_str().and_then(|p| p.parse::<Priority>().ok()))
            .unwrap_or_default();
        payload.remove("deviceId");
        payload.remove("timestamp");
        Some(OutboundMessage::new(app.kind, payload, priority, self.scheduler.now_ms()))
    }

    /// Send queued messages in priority order until the queue is empty or a
    /// send fails. Whatever is not sent stays queued.
    fn flush_queue(&mut self) {
        let mut flushed = 0;
        while self.state == ConnectionState::Connected {
            let Some(next) = self.queue.front() else {
                break;
            };
            let frame = match self.frame_for(next) {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::warn!("dropping unsendable queued message: {}", e);
                    self.queue.pop_front();
                    continue;
                }
            };
            if let Err(e) = self.transport.send(&frame) {
                tracing::warn!("flush interrupted, {} messages still queued: {}", self.queue.len(), e);
                break;
            }
            self.queue.pop_front();
            flushed += 1;
        }
        if flushed > 0 {
            tracing::info!("Flushed {} queued messages", flushed);
        }
    }

    fn add_device_name(&self, payload: &mut Value) {
        if let (Some(identity), Some(map)) = (self.identity(), payload.as_object_mut()) {
            map.insert("deviceName".to_string(), json!(identity.device_name()));
        }
    }

    fn dispatch(&mut self, event: &InboundEvent) {
        for handler in &mut self.event_handlers {
            handler(event);
        }
    }

    fn set_state(&mut self, new: ConnectionState) {
        let old = self.state;
        if old == new {
            return;
        }
        self.state = new;
        tracing::debug!("connection state {} -> {}", old, new);
        for handler in &mut self.state_handlers {
            handler(old, new);
        }
    }
}

fn into_object(payload: Value) -> Map<String, Value> {
    match payload {
        Value::Object(map) => map,
        other => {
            let mut map = Map::new();
            map.insert("value".to_string(), other);
            map
        }
    }
}

/// Scoped session: disconnects the connection when dropped.
pub struct Session<'a, T: Transport, S: Scheduler, A: AuthTokenProvider> {
    connection: &'a mut SyncConnection<T, S, A>,
}

impl<T: Transport, S: Scheduler, A: AuthTokenProvider> Deref for Session<'_, T, S, A> {
    type Target = SyncConnection<T, S, A>;

    fn deref(&self) -> &Self::Target {
        self.connection
    }
}

impl<T: Transport, S: Scheduler, A: AuthTokenProvider> DerefMut for Session<'_, T, S, A> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.connection
    }
}

impl<T: Transport, S: Scheduler, A: AuthTokenProvider> Drop for Session<'_, T, S, A> {
    fn drop(&mut self) {
        self.connection.disconnect();
    }
}
