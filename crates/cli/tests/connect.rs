// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

mod common;
use common::*;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(20);

#[test]
fn queues_messages_while_server_is_unreachable() {
    let temp = TempDir::new().unwrap();

    unilink(&temp)
        .args(["connect", "--endpoint", DEAD_ENDPOINT])
        .write_stdin("clipboard_sync high {\"content\":\"hi\"}\ndevice_status low\n/stats\n/quit\n")
        .timeout(TIMEOUT)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"queue_depth\":2"))
        .stdout(predicate::str::contains("\"high_priority_queue_depth\":1"));
}

#[test]
fn end_of_input_disconnects() {
    let temp = TempDir::new().unwrap();

    unilink(&temp)
        .args(["connect", "--endpoint", DEAD_ENDPOINT])
        .write_stdin("")
        .timeout(TIMEOUT)
        .assert()
        .success();
}

#[test]
fn persists_generated_device_id() {
    let temp = TempDir::new().unwrap();

    unilink(&temp)
        .args(["connect", "--endpoint", DEAD_ENDPOINT])
        .write_stdin("/quit\n")
        .timeout(TIMEOUT)
        .assert()
        .success();

    let id = std::fs::read_to_string(state_dir(&temp).join("device_id")).unwrap();
    assert!(id.trim().starts_with("desktop_"));
}

#[test]
fn device_id_from_environment_is_not_persisted() {
    let temp = TempDir::new().unwrap();

    unilink(&temp)
        .env("UNILINK_DEVICE_ID", "desktop_pinned")
        .args(["connect", "--endpoint", DEAD_ENDPOINT])
        .write_stdin("/quit\n")
        .timeout(TIMEOUT)
        .assert()
        .success();

    assert!(!state_dir(&temp).join("device_id").exists());
}

#[test]
fn bad_lines_are_reported_and_skipped() {
    let temp = TempDir::new().unwrap();

    unilink(&temp)
        .args(["connect", "--endpoint", DEAD_ENDPOINT])
        .write_stdin("note high {broken\n/bogus\nnote [1, 2]\nnote {}\n/stats\n")
        .timeout(TIMEOUT)
        .assert()
        .success()
        .stderr(predicate::str::contains("line 1: invalid JSON payload"))
        .stderr(predicate::str::contains("line 2: unknown command '/bogus'"))
        .stderr(predicate::str::contains("line 3: payload must be a JSON object"))
        .stdout(predicate::str::contains("\"queue_depth\":1"));
}

#[test]
fn rejects_non_websocket_endpoint() {
    let temp = TempDir::new().unwrap();

    unilink(&temp)
        .args(["connect", "--endpoint", "https://example.com"])
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid endpoint 'https://example.com'"));
}
