// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use clap::{Parser, Subcommand};

const CONNECT_HELP: &str = "\
Input (one per line on stdin):
  <kind> [low|medium|high] <json-object>
                                    Send a message (priority defaults to medium,
                                    payload to {})
  /stats                            Print connection stats as JSON
  /offline, /online                 Simulate network loss and recovery
  /quit                             Disconnect and exit (as does end of input)

Examples:
  clipboard_sync high {\"content\": \"hello\", \"contentType\": \"text\"}
  device_status low {\"status\": \"online\"}";

#[derive(Parser)]
#[command(name = "unilink")]
#[command(version, about = "Real-time sync client for unilink devices")]
pub struct Cli {
    /// Path to config.toml (default: UNILINK_CONFIG, then the user config dir)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log at debug level unless UNILINK_LOG is set
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the resolved configuration as TOML
    Config,

    /// Connect to the sync server and stream events as JSON lines
    #[command(after_help = CONNECT_HELP)]
    Connect {
        /// Override the configured endpoint (ws:// or wss://)
        #[arg(long, value_name = "URL")]
        endpoint: Option<String>,
    },
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
