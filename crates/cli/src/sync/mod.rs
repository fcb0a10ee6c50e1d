// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Real-time sync with the unilink server.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  commands   ┌────────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  SyncHandle  │────────────►│ SyncConnection │────►│  Transport  │────►│    Sync     │
//! │  (runtime)   │◄────────────│ (state machine)│◄────│   (trait)   │◄────│   Server    │
//! └──────────────┘   events    └────────────────┘     └─────────────┘     └─────────────┘
//!                                 │          │
//!                                 ▼          ▼
//!                          ┌────────────┐ ┌────────────┐
//!                          │PendingQueue│ │ Scheduler  │  (heartbeat, reconnect)
//!                          └────────────┘ └────────────┘
//! ```
//!
//! # Features
//!
//! - Authenticated WebSocket session with heartbeats
//! - Bounded priority queue for messages sent while disconnected
//! - Automatic reconnect with exponential backoff
//! - Network reachability hooks
//! - Injectable transport, scheduler and token source for testing

mod auth;
mod backoff;
mod connection;
mod queue;
pub mod runtime;
mod scheduler;
mod transport;

pub use auth::{AuthTokenProvider, EnvToken, StaticToken};
pub use backoff::ReconnectPolicy;
pub use connection::{ConnectionState, Session, SyncConnection, SyncSettings, SyncStats};
pub use queue::{OutboundMessage, PendingQueue};
pub use runtime::SyncHandle;
pub use scheduler::{Scheduler, TimerKind, TokioScheduler};
pub use transport::{Transport, TransportError, TransportEvent, WebSocketTransport};

#[cfg(test)]
mod test_helpers;






#[cfg(test)]
mod transport_tests;
