// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! unilink - real-time sync client for the unilink device mesh.
//!
//! This crate provides the core functionality for the `unilink` CLI tool,
//! which keeps a live WebSocket session with the sync server, queues
//! messages while offline and reconnects with backoff.
//!
//! # Main Components
//!
//! - [`sync::SyncConnection`] - connection state machine (handshake, heartbeat, reconnect)
//! - [`sync::runtime`] - tokio driver exposing a [`sync::SyncHandle`]
//! - [`Config`] - client configuration (endpoint, device identity, tunables)
//! - [`Error`] - Error types for all operations
//!
//! # Usage
//!
//! ```rust,ignore
//! use unilink::sync::{runtime, EnvToken};
//! use unilink::Config;
//!
//! let config = Config::load_or_default(&path)?;
//! let identity = config.identity(None, Some(&state_dir), &SystemClock)?;
//! let handle = runtime::spawn(config.sync_settings(), EnvToken);
//! handle.connect(config.endpoint.clone(), identity)?;
//! handle.send("clipboard_sync", json!({"content": "hi"}), Priority::High)?;
//! ```

mod cli;
mod commands;

pub mod config;
pub mod env;
pub mod error;
pub mod sync;

pub use cli::{Cli, Command};
pub use config::Config;
pub use error::{Error, Result};

/// Run a parsed command line.
pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Config => commands::config::run(cli.config),
        Command::Connect { endpoint } => commands::connect::run(cli.config, endpoint),
    }
}
