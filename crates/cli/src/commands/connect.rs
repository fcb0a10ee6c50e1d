// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! `unilink connect`: an interactive sync session on stdin/stdout.
//!
//! Inbound events are printed as JSON lines on stdout. Logs go to stderr.

use std::path::PathBuf;

use serde_json::{Map, Value};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use ul_core::{DeviceIdentity, InboundEvent, Priority, SystemClock};

use super::load_config;
use crate::config::{self, validate_endpoint, Config};
use crate::env;
use crate::error::{Error, Result};
use crate::sync::{runtime, EnvToken};

/// One line of user input.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Send { kind: String, priority: Priority, payload: Value },
    Stats,
    Online,
    Offline,
    Quit,
}

pub fn run(config_path: Option<PathBuf>, endpoint: Option<String>) -> Result<()> {
    let (mut config, _) = load_config(config_path)?;
    if let Some(endpoint) = endpoint {
        validate_endpoint(&endpoint)?;
        config.endpoint = endpoint;
    }
    let state_dir = config::state_dir();
    let identity = config.identity(env::device_id(), state_dir.as_deref(), &SystemClock)?;

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(session(config, identity))
}

async fn session(config: Config, identity: DeviceIdentity) -> Result<()> {
    tracing::info!("device {} ({})", identity.device_id, identity.device_name());

    let handle = runtime::spawn(config.sync_settings(), EnvToken);
    let printer = tokio::spawn(print_events(handle.subscribe(), identity.device_id.clone()));
    handle.connect(config.endpoint.clone(), identity)?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut line_no = 0;
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            break;
        };
        line_no += 1;

        match parse_line(&line, line_no) {
            Ok(None) => {}
            Ok(Some(Input::Quit)) => break,
            Ok(Some(Input::Stats)) => {
                println!("{}", serde_json::to_string(&handle.stats().await?)?);
            }
            Ok(Some(Input::Online)) => handle.network_up()?,
            Ok(Some(Input::Offline)) => handle.network_down()?,
            Ok(Some(Input::Send { kind, priority, payload })) => {
                handle.send(kind, payload, priority)?;
            }
            Err(e) => eprintln!("error: {}", e),
        }
    }

    handle.shutdown().await?;
    // The event channel closes with the engine
    let _ = printer.await;
    Ok(())
}

async fn print_events(mut events: tokio::sync::broadcast::Receiver<InboundEvent>, own_id: String) {
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(n)) => {
                tracing::warn!("skipped {} events", n);
                continue;
            }
            Err(RecvError::Closed) => break,
        };

        match &event {
            InboundEvent::ClipboardSync(clip) if clip.is_from(&own_id) => {
                tracing::debug!("ignoring clipboard echo from this device");
                continue;
            }
            InboundEvent::AiSuggestion(suggestion) if !suggestion.is_actionable() => {
                tracing::debug!("ignoring low-confidence suggestion: {}", suggestion.description);
                continue;
            }
            _ => {}
        }

        match event.to_json() {
            Ok(line) => println!("{}", line),
            Err(e) => tracing::warn!("failed to render {} event: {}", event.kind(), e),
        }
    }
}

/// Parse `<kind> [low|medium|high] <json-object>` or a `/command`.
///
/// Blank lines and `#` comments yield `None`. A missing payload is `{}`.
pub fn parse_line(line: &str, line_no: usize) -> Result<Option<Input>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let invalid = |reason: String| Error::ParseLineError { line: line_no, reason };

    if let Some(command) = line.strip_prefix('/') {
        return match command {
            "stats" => Ok(Some(Input::Stats)),
            "online" => Ok(Some(Input::Online)),
            "offline" => Ok(Some(Input::Offline)),
            "quit" | "exit" => Ok(Some(Input::Quit)),
            other => Err(invalid(format!("unknown command '/{}'", other))),
        };
    }

    let (kind, rest) = split_word(line);
    let (priority, json) = match split_word(rest) {
        (word, tail) if !word.is_empty() => match word.parse::<Priority>() {
            Ok(priority) => (priority, tail),
            Err(_) => (Priority::default(), rest),
        },
        _ => (Priority::default(), rest),
    };

    let payload = if json.is_empty() {
        Value::Object(Map::new())
    } else {
        serde_json::from_str(json).map_err(|e| invalid(format!("invalid JSON payload: {}", e)))?
    };
    if !payload.is_object() {
        return Err(invalid("payload must be a JSON object".to_string()));
    }

    Ok(Some(Input::Send { kind: kind.to_string(), priority, payload }))
}

fn split_word(s: &str) -> (&str, &str) {
    match s.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim_start()),
        None => (s, ""),
    }
}

#[cfg(test)]
#[path = "connect_tests.rs"]
mod tests;
