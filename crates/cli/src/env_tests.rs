// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use std::sync::Mutex;

// Serializes tests that modify environment variables
static ENV_MUTEX: Mutex<()> = Mutex::new(());

#[test]
fn test_vars_constants() {
    assert_eq!(vars::UNILINK_CONFIG, "UNILINK_CONFIG");
    assert_eq!(vars::UNILINK_TOKEN, "UNILINK_TOKEN");
    assert_eq!(vars::UNILINK_DEVICE_ID, "UNILINK_DEVICE_ID");
    assert_eq!(vars::UNILINK_STATE_DIR, "UNILINK_STATE_DIR");
    assert_eq!(vars::UNILINK_LOG, "UNILINK_LOG");
}

#[test]
fn test_token_unset() {
    let _guard = ENV_MUTEX.lock().unwrap();
    std::env::remove_var("UNILINK_TOKEN");
    assert_eq!(token(), None);
}

#[test]
fn test_token_set() {
    let _guard = ENV_MUTEX.lock().unwrap();
    std::env::set_var("UNILINK_TOKEN", "secret");
    assert_eq!(token(), Some("secret".to_string()));
    std::env::remove_var("UNILINK_TOKEN");
}

#[test]
fn test_token_blank_is_unset() {
    let _guard = ENV_MUTEX.lock().unwrap();
    std::env::set_var("UNILINK_TOKEN", "   ");
    assert_eq!(token(), None);
    std::env::remove_var("UNILINK_TOKEN");
}

#[test]
fn test_state_dir_set() {
    let _guard = ENV_MUTEX.lock().unwrap();
    std::env::set_var("UNILINK_STATE_DIR", "/tmp/unilink-test");
    assert_eq!(state_dir(), Some(PathBuf::from("/tmp/unilink-test")));
    std::env::remove_var("UNILINK_STATE_DIR");
}

#[test]
fn test_config_path_unset() {
    let _guard = ENV_MUTEX.lock().unwrap();
    std::env::remove_var("UNILINK_CONFIG");
    assert_eq!(config_path(), None);
}

#[test]
fn test_device_id_and_log_filter() {
    let _guard = ENV_MUTEX.lock().unwrap();
    std::env::set_var("UNILINK_DEVICE_ID", "desktop_x");
    std::env::set_var("UNILINK_LOG", "debug");
    assert_eq!(device_id(), Some("desktop_x".to_string()));
    assert_eq!(log_filter(), Some("debug".to_string()));
    std::env::remove_var("UNILINK_DEVICE_ID");
    std::env::remove_var("UNILINK_LOG");
}
