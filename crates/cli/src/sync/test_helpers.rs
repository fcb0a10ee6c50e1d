// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for sync module tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::StreamExt;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use ul_core::{ClockSource, DeviceIdentity, DeviceInfo, DeviceType, Platform};

use super::auth::StaticToken;
use super::connection::{SyncConnection, SyncSettings};
use super::scheduler::{Scheduler, TimerKind};
use super::transport_tests::MockTransport;

pub const TEST_ENDPOINT: &str = "ws://sync.test/ws";
pub const TEST_DEVICE_ID: &str = "desktop_0123456789ab";
pub const TEST_NOW_MS: u64 = 1_700_000_000_000;

pub fn test_identity() -> DeviceIdentity {
    DeviceIdentity::new(
        TEST_DEVICE_ID,
        DeviceInfo::new("Linux Desktop", DeviceType::Desktop, Platform::Linux),
    )
    .unwrap()
}

/// How a timer was armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Armed {
    Timeout(Duration),
    Interval(Duration),
}

#[derive(Debug, Default)]
struct SchedulerState {
    now_ms: u64,
    armed: HashMap<TimerKind, Armed>,
}

/// Scheduler that records armed timers; tests fire them by hand.
#[derive(Debug, Clone, Default)]
pub struct ManualScheduler {
    state: Arc<Mutex<SchedulerState>>,
}

impl ManualScheduler {
    pub fn new(now_ms: u64) -> Self {
        let scheduler = ManualScheduler::default();
        scheduler.state.lock().unwrap().now_ms = now_ms;
        scheduler
    }

    pub fn advance(&self, ms: u64) {
        self.state.lock().unwrap().now_ms += ms;
    }

    pub fn armed(&self, timer: TimerKind) -> Option<Armed> {
        self.state.lock().unwrap().armed.get(&timer).copied()
    }
}

impl ClockSource for ManualScheduler {
    fn now_ms(&self) -> u64 {
        self.state.lock().unwrap().now_ms
    }
}

impl Scheduler for ManualScheduler {
    fn set_timeout(&mut self, timer: TimerKind, delay: Duration) {
        self.state.lock().unwrap().armed.insert(timer, Armed::Timeout(delay));
    }

    fn set_interval(&mut self, timer: TimerKind, period: Duration) {
        self.state.lock().unwrap().armed.insert(timer, Armed::Interval(period));
    }

    fn cancel(&mut self, timer: TimerKind) {
        self.state.lock().unwrap().armed.remove(&timer);
    }
}

pub type TestConnection = SyncConnection<MockTransport, ManualScheduler, StaticToken>;

/// A connection wired to a mock transport and a manual scheduler, plus
/// handles to inspect both.
pub struct Harness {
    pub conn: TestConnection,
    pub transport: MockTransport,
    pub scheduler: ManualScheduler,
}

impl Harness {
    pub fn new() -> Self {
        Harness::with_settings(SyncSettings::default())
    }

    pub fn with_settings(settings: SyncSettings) -> Self {
        let transport = MockTransport::new();
        let scheduler = ManualScheduler::new(TEST_NOW_MS);
        let conn = SyncConnection::new(
            transport.clone(),
            scheduler.clone(),
            StaticToken::new("test-token"),
            settings,
        );
        Harness { conn, transport, scheduler }
    }

    /// Connect and complete the handshake.
    pub fn connected() -> Self {
        let mut harness = Harness::new();
        harness.establish();
        harness
    }

    pub fn establish(&mut self) {
        self.conn.connect(TEST_ENDPOINT, test_identity());
        self.open_and_authenticate();
    }

    pub fn open_and_authenticate(&mut self) {
        self.conn.handle_transport_event(super::transport::TransportEvent::Opened);
        self.server_says(r#"{"type":"auth_success"}"#);
    }

    pub fn server_says(&mut self, frame: &str) {
        self.conn
            .handle_transport_event(super::transport::TransportEvent::Message(frame.to_string()));
    }

    pub fn drop_connection(&mut self) {
        self.conn.handle_transport_event(super::transport::TransportEvent::Closed {
            code: 1006,
            reason: String::new(),
        });
    }

    /// Fire an armed timer the way the runtime would.
    pub fn fire(&mut self, timer: TimerKind) {
        let armed = self.scheduler.armed(timer);
        assert!(armed.is_some(), "{:?} timer is not armed", timer);
        if let Some(Armed::Timeout(_)) = armed {
            self.scheduler.clone().cancel(timer);
        }
        self.conn.handle_timer(timer);
    }
}

pub type ServerSocket = WebSocketStream<tokio::net::TcpStream>;

/// Start a WebSocket server on a free local port. Each accepted socket is
/// handed to the test through the returned receiver.
pub async fn spawn_server() -> (String, mpsc::UnboundedReceiver<ServerSocket>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            if let Ok(ws) = tokio_tungstenite::accept_async(stream).await {
                if tx.send(ws).is_err() {
                    break;
                }
            }
        }
    });

    (format!("ws://{}", addr), rx)
}

/// Start a server that accepts TCP connections and hangs up before the
/// WebSocket handshake, so every connection attempt fails.
pub async fn spawn_hangup_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            drop(stream);
        }
    });

    format!("ws://{}", addr)
}

/// Next text frame from the client, parsed as JSON.
pub async fn next_json(ws: &mut ServerSocket) -> Value {
    let read = async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => return serde_json::from_str(text.as_str()).unwrap(),
                Some(Ok(_)) => continue,
                other => panic!("socket ended: {:?}", other),
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(5), read).await.expect("timed out waiting for frame")
}
