// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access.
//!
//! All runtime environment variables used by the CLI are defined here
//! with typed accessor functions. The variable name constants are generated
//! by `build.rs` and live in the [`vars`] submodule.

use std::path::PathBuf;

/// Generated environment variable name constants.
pub mod vars {
    include!(concat!(env!("OUT_DIR"), "/env_vars.rs"));
}

/// Returns the value of `UNILINK_CONFIG` if set.
pub fn config_path() -> Option<PathBuf> {
    non_empty(vars::UNILINK_CONFIG).map(PathBuf::from)
}

/// Returns the bearer token from `UNILINK_TOKEN` if set and non-empty.
pub fn token() -> Option<String> {
    non_empty(vars::UNILINK_TOKEN)
}

/// Returns the device id override from `UNILINK_DEVICE_ID` if set.
pub fn device_id() -> Option<String> {
    non_empty(vars::UNILINK_DEVICE_ID)
}

/// Returns the value of `UNILINK_STATE_DIR` if set.
pub fn state_dir() -> Option<PathBuf> {
    non_empty(vars::UNILINK_STATE_DIR).map(PathBuf::from)
}

/// Returns the log filter directive from `UNILINK_LOG` if set.
pub fn log_filter() -> Option<String> {
    non_empty(vars::UNILINK_LOG)
}

fn non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
