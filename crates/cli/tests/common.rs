// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

// Allow unused items: test helpers are shared across multiple test binaries,
// and not every test file uses every helper.
#![allow(dead_code)]
#![allow(unused_imports)]

use std::path::PathBuf;

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;

pub use predicates::prelude::*;
pub use tempfile::TempDir;

/// An endpoint nothing listens on.
pub const DEAD_ENDPOINT: &str = "ws://127.0.0.1:9/ws";

/// `unilink` isolated from the user's config, state and token.
pub fn unilink(temp: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("unilink");
    cmd.env("XDG_CONFIG_HOME", temp.path().join("config"))
        .env("HOME", temp.path())
        .env("UNILINK_STATE_DIR", state_dir(temp))
        .env("UNILINK_LOG", "off")
        .env_remove("UNILINK_CONFIG")
        .env_remove("UNILINK_TOKEN")
        .env_remove("UNILINK_DEVICE_ID");
    cmd
}

pub fn state_dir(temp: &TempDir) -> PathBuf {
    temp.path().join("state")
}

/// Write `content` as a config file in `temp` and return its path.
pub fn write_config(temp: &TempDir, content: &str) -> PathBuf {
    let path = temp.path().join("unilink.toml");
    std::fs::write(&path, content).unwrap();
    path
}
