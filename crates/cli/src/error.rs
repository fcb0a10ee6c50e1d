// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// All possible errors that can occur in the unilink library.
///
/// Errors provide user-friendly messages with hints for common issues.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid endpoint '{0}'\n  hint: endpoints must start with ws:// or wss://")]
    InvalidEndpoint(String),

    #[error("{field} must be greater than zero")]
    ZeroSetting { field: &'static str },

    #[error("base reconnect delay ({base_ms}ms) exceeds the maximum ({max_ms}ms)")]
    InvalidBackoff { base_ms: u64, max_ms: u64 },

    #[error("line {line}: {reason}\n  hint: expected '<kind> [low|medium|high] <json-object>'")]
    ParseLineError { line: usize, reason: String },

    #[error("no state directory available\n  hint: set UNILINK_STATE_DIR or device_id in the config")]
    NoStateDir,

    #[error("sync engine stopped")]
    EngineStopped,

    #[error(transparent)]
    Core(#[from] ul_core::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),
}

/// Result type alias for unilink operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
