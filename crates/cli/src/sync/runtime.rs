// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Tokio driver for a [`SyncConnection`].
//!
//! The connection lives on one task. Socket events, fired timers and
//! caller commands are multiplexed onto it with `select!`, so the state
//! machine is only ever touched from a single logical thread.

use serde_json::Value;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use ul_core::{DeviceIdentity, InboundEvent, Priority};

use super::auth::AuthTokenProvider;
use super::connection::{ConnectionState, SyncConnection, SyncSettings, SyncStats};
use super::scheduler::{TimerFired, TokioScheduler};
use super::transport::{TaggedEvent, WebSocketTransport};
use crate::error::{Error, Result};

/// Inbound events buffered per subscriber before it starts lagging.
const EVENT_BUFFER: usize = 256;

type EngineConnection<A> = SyncConnection<WebSocketTransport, TokioScheduler, A>;

enum Command {
    Connect { endpoint: String, identity: DeviceIdentity },
    Send { kind: String, payload: Value, priority: Priority },
    Disconnect,
    NetworkUp,
    NetworkDown,
    Stats(oneshot::Sender<SyncStats>),
    Shutdown,
}

/// Handle to a running sync engine.
///
/// Dropping the handle disconnects and stops the engine.
pub struct SyncHandle {
    commands: mpsc::UnboundedSender<Command>,
    events: broadcast::Sender<InboundEvent>,
    state: watch::Receiver<ConnectionState>,
    task: Option<JoinHandle<()>>,
}

/// Spawn a sync engine on the current tokio runtime.
pub fn spawn<A>(settings: SyncSettings, auth: A) -> SyncHandle
where
    A: AuthTokenProvider + 'static,
{
    let (transport_tx, transport_rx) = mpsc::unbounded_channel();
    let (timer_tx, timer_rx) = mpsc::unbounded_channel();
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (event_tx, _) = broadcast::channel(EVENT_BUFFER);
    let (state_tx, state_rx) = watch::channel(ConnectionState::Idle);

    let mut connection = SyncConnection::new(
        WebSocketTransport::new(transport_tx),
        TokioScheduler::new(timer_tx),
        auth,
        settings,
    );

    let events = event_tx.clone();
    connection.on_event(move |event| {
        // No subscribers is fine
        let _ = events.send(event.clone());
    });
    connection.on_state_change(move |_, new| {
        state_tx.send_replace(new);
    });

    let task = tokio::spawn(drive(connection, command_rx, transport_rx, timer_rx));

    SyncHandle { commands: command_tx, events: event_tx, state: state_rx, task: Some(task) }
}

async fn drive<A: AuthTokenProvider>(
    mut connection: EngineConnection<A>,
    mut commands: mpsc::UnboundedReceiver<Command>,
    mut transport_events: mpsc::UnboundedReceiver<TaggedEvent>,
    mut timers: mpsc::UnboundedReceiver<TimerFired>,
) {
    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(Command::Shutdown) | None => break,
                Some(command) => apply(&mut connection, command),
            },
            Some((generation, event)) = transport_events.recv() => {
                if generation == connection.transport().generation() {
                    connection.handle_transport_event(event);
                } else {
                    tracing::trace!("dropping event from stale socket: {:?}", event);
                }
            }
            Some((timer, epoch)) = timers.recv() => {
                if connection.scheduler().is_current(timer, epoch) {
                    connection.handle_timer(timer);
                }
            }
        }
    }

    connection.disconnect();
    tracing::debug!("sync engine stopped");
}

fn apply<A: AuthTokenProvider>(connection: &mut EngineConnection<A>, command: Command) {
    match command {
        Command::Connect { endpoint, identity } => connection.connect(&endpoint, identity),
        Command::Send { kind, payload, priority } => connection.send(&kind, payload, priority),
        Command::Disconnect => connection.disconnect(),
        Command::NetworkUp => connection.network_up(),
        Command::NetworkDown => connection.network_down(),
        Command::Stats(reply) => {
            let _ = reply.send(connection.stats());
        }
        Command::Shutdown => {}
    }
}

impl SyncHandle {
    fn command(&self, command: Command) -> Result<()> {
        self.commands.send(command).map_err(|_| Error::EngineStopped)
    }

    pub fn connect(&self, endpoint: impl Into<String>, identity: DeviceIdentity) -> Result<()> {
        self.command(Command::Connect { endpoint: endpoint.into(), identity })
    }

    pub fn send(&self, kind: impl Into<String>, payload: Value, priority: Priority) -> Result<()> {
        self.command(Command::Send { kind: kind.into(), payload, priority })
    }

    pub fn disconnect(&self) -> Result<()> {
        self.command(Command::Disconnect)
    }

    pub fn network_up(&self) -> Result<()> {
        self.command(Command::NetworkUp)
    }

    pub fn network_down(&self) -> Result<()> {
        self.command(Command::NetworkDown)
    }

    pub async fn stats(&self) -> Result<SyncStats> {
        let (tx, rx) = oneshot::channel();
        self.command(Command::Stats(tx))?;
        rx.await.map_err(|_| Error::EngineStopped)
    }

    /// Receive every inbound event from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<InboundEvent> {
        self.events.subscribe()
    }

    /// Watch connection state changes.
    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Disconnect and wait for the engine task to finish.
    pub async fn shutdown(mut self) -> Result<()> {
        let _ = self.commands.send(Command::Shutdown);
        if let Some(task) = self.task.take() {
            task.await.map_err(|_| Error::EngineStopped)?;
        }
        Ok(())
    }
}

impl Drop for SyncHandle {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Shutdown);
    }
}
