// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for ul-core operations.

use thiserror::Error;

/// All possible errors that can occur in ul-core operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid priority: '{0}'\n  hint: valid priorities are: low, medium, high")]
    InvalidPriority(String),

    #[error("invalid device type: '{0}'\n  hint: valid types are: desktop, mobile, tablet, browser")]
    InvalidDeviceType(String),

    #[error(
        "invalid platform: '{0}'\n  hint: valid platforms are: windows, macos, linux, android, ios, browser"
    )]
    InvalidPlatform(String),

    #[error("invalid device id: '{0}'\n  hint: device ids must be non-empty and contain no whitespace")]
    InvalidDeviceId(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for ul-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
