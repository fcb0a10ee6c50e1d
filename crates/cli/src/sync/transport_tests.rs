// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for the transport module.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use super::transport::*;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug, Default)]
struct MockState {
    opened: Vec<String>,
    sent: Vec<String>,
    closed: Vec<u16>,
    open_fails: bool,
    send_fails: bool,
    sends_before_failure: Option<usize>,
}

/// Mock transport for testing without real sockets.
///
/// Clones share state, so a test keeps one clone to inspect what the
/// connection did with the other.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        MockTransport::default()
    }

    /// URLs passed to open(), in order.
    pub fn opened(&self) -> Vec<String> {
        self.state.lock().unwrap().opened.clone()
    }

    /// Frames passed to send(), in order.
    pub fn sent(&self) -> Vec<String> {
        self.state.lock().unwrap().sent.clone()
    }

    /// Sent frames parsed as JSON.
    pub fn sent_json(&self) -> Vec<Value> {
        self.sent().iter().map(|f| serde_json::from_str(f).unwrap()).collect()
    }

    /// `type` of every sent frame.
    pub fn sent_kinds(&self) -> Vec<String> {
        self.sent_json().iter().map(|v| v["type"].as_str().unwrap().to_string()).collect()
    }

    pub fn clear_sent(&self) {
        self.state.lock().unwrap().sent.clear();
    }

    /// Close codes passed to close(), in order.
    pub fn closes(&self) -> Vec<u16> {
        self.state.lock().unwrap().closed.clone()
    }

    pub fn set_open_fails(&self, fail: bool) {
        self.state.lock().unwrap().open_fails = fail;
    }

    pub fn set_send_fails(&self, fail: bool) {
        self.state.lock().unwrap().send_fails = fail;
    }

    /// Let `n` more sends succeed, then fail every send.
    pub fn fail_sends_after(&self, n: usize) {
        self.state.lock().unwrap().sends_before_failure = Some(n);
    }
}

impl Transport for MockTransport {
    fn open(&mut self, url: &str) -> TransportResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.open_fails {
            return Err(TransportError::ConnectionFailed("mock failure".into()));
        }
        state.opened.push(url.to_string());
        Ok(())
    }

    fn send(&mut self, frame: &str) -> TransportResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.send_fails {
            return Err(TransportError::SendFailed("mock failure".into()));
        }
        if let Some(remaining) = state.sends_before_failure.as_mut() {
            if *remaining == 0 {
                return Err(TransportError::SendFailed("mock failure".into()));
            }
            *remaining -= 1;
        }
        state.sent.push(frame.to_string());
        Ok(())
    }

    fn close(&mut self, code: u16, _reason: &str) {
        self.state.lock().unwrap().closed.push(code);
    }
}

#[test]
fn mock_records_calls() {
    let mock = MockTransport::new();
    let mut transport = mock.clone();

    transport.open("ws://a").unwrap();
    transport.send(r#"{"type":"x"}"#).unwrap();
    transport.close(CLOSE_NORMAL, "bye");

    assert_eq!(mock.opened(), vec!["ws://a"]);
    assert_eq!(mock.sent_kinds(), vec!["x"]);
    assert_eq!(mock.closes(), vec![1000]);
}

#[test]
fn mock_scripted_failures() {
    let mock = MockTransport::new();
    let mut transport = mock.clone();

    mock.set_open_fails(true);
    assert!(matches!(transport.open("ws://a"), Err(TransportError::ConnectionFailed(_))));

    mock.fail_sends_after(1);
    assert!(transport.send("{}").is_ok());
    assert!(matches!(transport.send("{}"), Err(TransportError::SendFailed(_))));
    assert_eq!(mock.sent().len(), 1);
}

#[test]
fn transport_error_display() {
    assert_eq!(TransportError::ConnectionClosed.to_string(), "connection closed");
    assert_eq!(
        TransportError::ConnectionFailed("refused".into()).to_string(),
        "connection failed: refused"
    );
}

#[test]
fn websocket_rejects_non_websocket_url() {
    let (tx, _rx) = mpsc::unbounded_channel();
    let mut transport = WebSocketTransport::new(tx);

    let err = transport.open("http://localhost:5000").unwrap_err();
    assert!(matches!(err, TransportError::ConnectionFailed(_)));
    assert_eq!(transport.generation(), 0);
}

#[test]
fn websocket_open_outside_runtime_fails() {
    let (tx, _rx) = mpsc::unbounded_channel();
    let mut transport = WebSocketTransport::new(tx);

    assert!(transport.open("ws://127.0.0.1:9").is_err());
}

#[test]
fn websocket_send_before_open_fails() {
    let (tx, _rx) = mpsc::unbounded_channel();
    let mut transport = WebSocketTransport::new(tx);

    assert_eq!(transport.send("{}"), Err(TransportError::ConnectionClosed));
    // Closing an unopened transport is a no-op
    transport.close(CLOSE_NORMAL, "");
    assert_eq!(transport.generation(), 0);
}

#[tokio::test]
async fn websocket_reports_refused_connection() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut transport = WebSocketTransport::new(tx);
    transport.open(&format!("ws://{}", addr)).unwrap();

    let (generation, event) =
        tokio::time::timeout(Duration::from_secs(5), rx.recv()).await.unwrap().unwrap();
    assert_eq!(generation, 1);
    assert!(matches!(event, TransportEvent::Error(_)));
}

#[tokio::test]
async fn websocket_round_trip_with_server() {
    use super::test_helpers::{next_json, spawn_server};
    use futures_util::SinkExt;
    use tokio_tungstenite::tungstenite::Message;

    let (url, mut accepted) = spawn_server().await;
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut transport = WebSocketTransport::new(tx);

    transport.open(&url).unwrap();
    let mut server = accepted.recv().await.unwrap();
    assert_eq!(rx.recv().await.unwrap(), (1, TransportEvent::Opened));

    transport.send(r#"{"type":"heartbeat"}"#).unwrap();
    assert_eq!(next_json(&mut server).await["type"], "heartbeat");

    server.send(Message::Text(r#"{"type":"auth_success"}"#.into())).await.unwrap();
    assert_eq!(
        rx.recv().await.unwrap(),
        (1, TransportEvent::Message(r#"{"type":"auth_success"}"#.to_string()))
    );

    transport.close(CLOSE_NORMAL, "done");
    assert_eq!(transport.generation(), 2);
    assert_eq!(transport.send("{}"), Err(TransportError::ConnectionClosed));
}

#[tokio::test]
async fn websocket_reports_server_close_code() {
    use futures_util::SinkExt;
    use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
    use tokio_tungstenite::tungstenite::protocol::CloseFrame;
    use tokio_tungstenite::tungstenite::Message;

    let (url, mut accepted) = super::test_helpers::spawn_server().await;
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut transport = WebSocketTransport::new(tx);

    transport.open(&url).unwrap();
    let mut server = accepted.recv().await.unwrap();
    assert_eq!(rx.recv().await.unwrap().1, TransportEvent::Opened);

    let frame = CloseFrame { code: CloseCode::Away, reason: "restarting".into() };
    server.send(Message::Close(Some(frame))).await.unwrap();

    let (_, event) = tokio::time::timeout(Duration::from_secs(5), rx.recv()).await.unwrap().unwrap();
    assert_eq!(event, TransportEvent::Closed { code: 1001, reason: "restarting".to_string() });
}

#[tokio::test]
async fn websocket_hands_back_frames_it_never_wrote() {
    let url = super::test_helpers::spawn_hangup_server().await;
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut transport = WebSocketTransport::new(tx);

    transport.open(&url).unwrap();
    // Accepted before the socket task gets to run
    transport.send(r#"{"type":"note","data":{"n":1}}"#).unwrap();
    transport.send(r#"{"type":"note","data":{"n":2}}"#).unwrap();

    let (generation, event) =
        tokio::time::timeout(Duration::from_secs(5), rx.recv()).await.unwrap().unwrap();
    assert_eq!(generation, 1);
    assert_eq!(
        event,
        TransportEvent::Unsent(vec![
            r#"{"type":"note","data":{"n":1}}"#.to_string(),
            r#"{"type":"note","data":{"n":2}}"#.to_string(),
        ])
    );
    let (_, event) = tokio::time::timeout(Duration::from_secs(5), rx.recv()).await.unwrap().unwrap();
    assert!(matches!(event, TransportEvent::Error(_)));

    // Nothing more can be lost: later sends fail right away
    assert_eq!(transport.send("{}"), Err(TransportError::ConnectionClosed));
}

#[tokio::test]
async fn websocket_reports_nothing_unsent_after_clean_writes() {
    use super::test_helpers::{next_json, spawn_server};

    let (url, mut accepted) = spawn_server().await;
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut transport = WebSocketTransport::new(tx);

    transport.open(&url).unwrap();
    let mut server = accepted.recv().await.unwrap();
    assert_eq!(rx.recv().await.unwrap().1, TransportEvent::Opened);

    transport.send(r#"{"type":"note"}"#).unwrap();
    assert_eq!(next_json(&mut server).await["type"], "note");
    drop(server);

    let (_, event) = tokio::time::timeout(Duration::from_secs(5), rx.recv()).await.unwrap().unwrap();
    assert!(matches!(event, TransportEvent::Error(_) | TransportEvent::Closed { .. }));
}
